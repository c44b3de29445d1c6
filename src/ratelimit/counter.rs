//! Fixed-window counter records and the decisions derived from them.

use serde::Serialize;

/// Consumption state for one key within its current window.
///
/// Records are replaced, never reset in place, when their window expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    /// Units consumed in the current window
    pub count: u32,
    /// Epoch milliseconds at which the window expires
    pub reset_at: u64,
    /// Epoch milliseconds of the last write, used for idle expiry
    pub written_at: u64,
}

impl RateLimitRecord {
    /// Open a new window at `now` with one unit already consumed.
    pub fn open(now: u64, window_ms: u64) -> Self {
        Self {
            count: 1,
            reset_at: now.saturating_add(window_ms),
            written_at: now,
        }
    }

    /// Whether the window has run out at `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.reset_at
    }

    /// Whether the record outlived the registry's entry time-to-live.
    pub fn is_stale(&self, now: u64, entry_ttl_ms: u64) -> bool {
        now.saturating_sub(self.written_at) >= entry_ttl_ms
    }

    /// Consume one more unit, returning the updated record.
    pub fn consume(self, now: u64) -> Self {
        Self {
            count: self.count.saturating_add(1),
            written_at: now,
            ..self
        }
    }
}

/// Outcome of a check-and-consume call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    /// Whether the unit was granted
    pub allowed: bool,
    /// Units left in the current window
    pub remaining: u32,
    /// Epoch milliseconds at which the window resets
    pub reset_at: u64,
}

impl RateLimitDecision {
    pub(crate) fn allowed(remaining: u32, reset_at: u64) -> Self {
        Self {
            allowed: true,
            remaining,
            reset_at,
        }
    }

    pub(crate) fn rejected(reset_at: u64) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            reset_at,
        }
    }

    /// Whole seconds until the window resets, rounded up.
    pub fn retry_after_secs(&self, now: u64) -> u64 {
        self.reset_at.saturating_sub(now).div_ceil(1000)
    }
}
