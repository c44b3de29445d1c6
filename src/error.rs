//! Error types for Coursekit.

use thiserror::Error;

/// Returned when a key has used up its quota for the current window.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Too many requests. Please try again in {retry_after_secs} seconds.")]
pub struct RateLimitExceeded {
    /// The rate limit key that was rejected
    pub key: String,
    /// Whole seconds until the window resets, rounded up
    pub retry_after_secs: u64,
    /// Epoch milliseconds at which the window resets
    pub reset_at: u64,
}

/// Main error type for Coursekit operations.
#[derive(Error, Debug)]
pub enum CoursekitError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limit rejections surfaced through the crate error type
    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for CoursekitError {
    fn from(err: config::ConfigError) -> Self {
        CoursekitError::Config(err.to_string())
    }
}

/// Result type alias for Coursekit operations.
pub type Result<T> = std::result::Result<T, CoursekitError>;
