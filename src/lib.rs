//! Coursekit - request shaping and pagination for a course marketplace
//!
//! This crate provides an in-process, fixed-window rate limiter over a bounded
//! LRU map, and pure helpers that turn fetched rows into cursor- or
//! offset-style page envelopes. It performs no I/O and shares no state across
//! processes.

pub mod config;
pub mod error;
pub mod pagination;
pub mod ratelimit;
