//! In-process rate limit registry.

use moka::ops::compute::Op;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::RegistryConfig;
use crate::error::RateLimitExceeded;

use super::clock::{Clock, SystemClock};
use super::counter::{RateLimitDecision, RateLimitRecord};
use super::policy::RateLimitPolicy;

/// Fixed-window rate limiter over a bounded, LRU-evicted map of keys.
///
/// The registry is meant to be built once at startup and shared (behind an
/// `Arc`) by every request handler. Bursts of up to `2 * limit` are possible
/// across a window boundary.
///
/// Memory is bounded by `capacity`. A key pushed out by LRU eviction, or idle
/// for longer than the entry time-to-live, loses its count and starts over
/// with a fresh window, even if its own window had not yet ended. Quotas are
/// per process; running several instances multiplies the effective limit.
pub struct RateLimitRegistry<C: Clock = SystemClock> {
    /// Records indexed by rate limit key
    records: Cache<String, RateLimitRecord>,
    /// Time source for the clock-driven operations
    clock: C,
    capacity: u64,
    entry_ttl_ms: u64,
}

impl RateLimitRegistry<SystemClock> {
    /// Create a registry driven by the wall clock.
    pub fn new(config: &RegistryConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for RateLimitRegistry<SystemClock> {
    fn default() -> Self {
        Self::new(&RegistryConfig::default())
    }
}

impl<C: Clock> RateLimitRegistry<C> {
    /// Create a registry with a custom time source.
    pub fn with_clock(config: &RegistryConfig, clock: C) -> Self {
        let capacity = config.capacity.max(1);
        let entry_ttl_ms = config.entry_ttl_ms.max(1);

        let records = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .time_to_live(Duration::from_millis(entry_ttl_ms))
            .build();

        debug!(capacity, entry_ttl_ms, "Rate limit registry initialized");

        Self {
            records,
            clock,
            capacity,
            entry_ttl_ms,
        }
    }

    /// Consume one unit for `key` at the current clock time.
    pub fn check_and_consume(&self, key: &str, limit: u32, window_ms: u64) -> RateLimitDecision {
        self.check_and_consume_at(key, limit, window_ms, self.clock.now_millis())
    }

    /// Consume one unit for `key` as of `now` (epoch milliseconds).
    ///
    /// A missing, expired or stale record is replaced by a fresh window with
    /// one unit consumed. A record already at `limit` is left untouched and the
    /// call is rejected. Otherwise the count is incremented.
    ///
    /// The read-check-write runs atomically per key. A `limit` or `window_ms`
    /// of zero is treated as one.
    pub fn check_and_consume_at(
        &self,
        key: &str,
        limit: u32,
        window_ms: u64,
        now: u64,
    ) -> RateLimitDecision {
        let limit = limit.max(1);
        let window_ms = window_ms.max(1);
        let entry_ttl_ms = self.entry_ttl_ms;

        trace!(key = %key, limit, window_ms, now, "Checking rate limit");

        let fresh = RateLimitRecord::open(now, window_ms);
        let mut decision = RateLimitDecision::allowed(limit - 1, fresh.reset_at);

        self.records.entry_by_ref(key).and_compute_with(|current| {
            let live = current
                .map(|entry| entry.into_value())
                .filter(|record| !record.is_expired(now) && !record.is_stale(now, entry_ttl_ms));

            match live {
                None => {
                    debug!(key = %key, reset_at = fresh.reset_at, "Opening rate limit window");
                    Op::Put(fresh)
                }
                Some(record) if record.count >= limit => {
                    debug!(key = %key, reset_at = record.reset_at, "Rate limit exceeded");
                    decision = RateLimitDecision::rejected(record.reset_at);
                    Op::Nop
                }
                Some(record) => {
                    let record = record.consume(now);
                    decision =
                        RateLimitDecision::allowed(limit.saturating_sub(record.count), record.reset_at);
                    Op::Put(record)
                }
            }
        });

        decision
    }

    /// Consume one unit according to a named policy.
    pub fn check_policy(&self, key: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        self.check_and_consume(key, policy.limit, policy.window_ms)
    }

    /// Run `action` only if `key` still has quota.
    ///
    /// The consumed unit is not refunded if the action itself fails.
    pub fn run_with_limit<T, F>(
        &self,
        key: &str,
        limit: u32,
        window_ms: u64,
        action: F,
    ) -> Result<T, RateLimitExceeded>
    where
        F: FnOnce() -> T,
    {
        self.admit(key, limit, window_ms)?;
        Ok(action())
    }

    /// Run a fallible `action` only if `key` still has quota.
    ///
    /// Errors from `action` are returned as-is. A rejection is converted into
    /// the caller's error type.
    pub fn try_run_with_limit<T, E, F>(
        &self,
        key: &str,
        limit: u32,
        window_ms: u64,
        action: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RateLimitExceeded>,
    {
        self.admit(key, limit, window_ms)?;
        action()
    }

    /// [`run_with_limit`](Self::run_with_limit) using a named policy.
    pub fn run_with_policy<T, F>(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
        action: F,
    ) -> Result<T, RateLimitExceeded>
    where
        F: FnOnce() -> T,
    {
        self.run_with_limit(key, policy.limit, policy.window_ms, action)
    }

    fn admit(&self, key: &str, limit: u32, window_ms: u64) -> Result<(), RateLimitExceeded> {
        let now = self.clock.now_millis();
        let decision = self.check_and_consume_at(key, limit, window_ms, now);
        if decision.allowed {
            return Ok(());
        }

        Err(RateLimitExceeded {
            key: key.to_string(),
            retry_after_secs: decision.retry_after_secs(now),
            reset_at: decision.reset_at,
        })
    }

    /// Approximate number of records held. Call
    /// [`run_pending_tasks`](Self::run_pending_tasks) first for an exact figure.
    pub fn entry_count(&self) -> u64 {
        self.records.entry_count()
    }

    /// Apply pending evictions and expirations now.
    pub fn run_pending_tasks(&self) {
        self.records.run_pending_tasks();
    }

    /// Maximum number of keys tracked at once.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Idle time after which a key's record is forgotten.
    pub fn entry_ttl(&self) -> Duration {
        Duration::from_millis(self.entry_ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{ManualClock, RateLimitKey};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn test_registry(clock: &ManualClock) -> RateLimitRegistry<ManualClock> {
        let config = RegistryConfig {
            capacity: 500,
            entry_ttl_ms: 600_000,
        };
        RateLimitRegistry::with_clock(&config, clock.clone())
    }

    #[test]
    fn test_consume_counts_down_to_zero() {
        let registry = test_registry(&ManualClock::new(0));

        for expected in (0..5).rev() {
            let decision = registry.check_and_consume("enroll:user42", 5, 60_000);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected);
            assert_eq!(decision.reset_at, 60_000);
        }

        let decision = registry.check_and_consume("enroll:user42", 5, 60_000);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset_at, 60_000);
    }

    proptest! {
        #[test]
        fn prop_remaining_counts_down_then_rejects(limit in 1u32..200) {
            let registry = test_registry(&ManualClock::new(0));

            for expected in (0..limit).rev() {
                let decision = registry.check_and_consume("k", limit, 60_000);
                prop_assert!(decision.allowed);
                prop_assert_eq!(decision.remaining, expected);
            }

            let decision = registry.check_and_consume("k", limit, 60_000);
            prop_assert!(!decision.allowed);
            prop_assert_eq!(decision.remaining, 0);
        }
    }

    #[test]
    fn test_enroll_scenario() {
        let clock = ManualClock::new(0);
        let registry = test_registry(&clock);
        let policy = RateLimitPolicy::per_minute(5);
        let key = RateLimitKey::new("enroll", "user42").to_string();

        let remaining: Vec<u32> = (0..5)
            .map(|_| registry.check_policy(&key, &policy))
            .inspect(|decision| assert!(decision.allowed))
            .map(|decision| decision.remaining)
            .collect();
        assert_eq!(remaining, vec![4, 3, 2, 1, 0]);

        clock.set(100);
        let err = registry.run_with_policy(&key, &policy, || ()).unwrap_err();
        assert_eq!(err.retry_after_secs, 60);
        assert_eq!(err.reset_at, 60_000);
        assert_eq!(err.key, "enroll:user42");

        clock.set(60_001);
        let decision = registry.check_policy(&key, &policy);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);
        assert_eq!(decision.reset_at, 120_001);
    }

    #[test]
    fn test_window_reset_starts_fresh() {
        let registry = test_registry(&ManualClock::new(0));

        for _ in 0..3 {
            registry.check_and_consume_at("k", 3, 1_000, 0);
        }
        assert!(!registry.check_and_consume_at("k", 3, 1_000, 999).allowed);

        let decision = registry.check_and_consume_at("k", 3, 1_000, 1_000);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
        assert_eq!(decision.reset_at, 2_000);
    }

    #[test]
    fn test_rejection_does_not_extend_window() {
        let registry = test_registry(&ManualClock::new(0));

        registry.check_and_consume_at("k", 1, 1_000, 0);
        let first = registry.check_and_consume_at("k", 1, 1_000, 500);
        let second = registry.check_and_consume_at("k", 1, 1_000, 900);
        assert!(!first.allowed && !second.allowed);
        assert_eq!(first.reset_at, 1_000);
        assert_eq!(second.reset_at, 1_000);
    }

    #[test]
    fn test_distinct_keys_are_independent() {
        let registry = test_registry(&ManualClock::new(0));

        registry.check_and_consume("createReview:198.51.100.7", 1, 60_000);
        assert!(!registry.check_and_consume("createReview:198.51.100.7", 1, 60_000).allowed);

        let other = registry.check_and_consume("createReview:198.51.100.8", 1, 60_000);
        assert!(other.allowed);
        assert_eq!(other.remaining, 0);
    }

    #[test]
    fn test_zero_limit_is_treated_as_one() {
        let registry = test_registry(&ManualClock::new(0));

        let decision = registry.check_and_consume("k", 0, 0);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset_at, 1);
        assert!(!registry.check_and_consume("k", 0, 0).allowed);
    }

    #[test]
    fn test_idle_record_is_forgotten_after_ttl() {
        let clock = ManualClock::new(0);
        let config = RegistryConfig {
            capacity: 100,
            entry_ttl_ms: 60_000,
        };
        let registry = RateLimitRegistry::with_clock(&config, clock.clone());

        registry.check_and_consume("apply:user7", 1, 3_600_000);
        assert!(!registry.check_and_consume("apply:user7", 1, 3_600_000).allowed);

        // The window runs for an hour but the entry expires after a minute.
        clock.set(60_000);
        let decision = registry.check_and_consume("apply:user7", 1, 3_600_000);
        assert!(decision.allowed);
        assert_eq!(decision.reset_at, 3_660_000);
    }

    #[test]
    fn test_capacity_bounds_entry_count() {
        let config = RegistryConfig {
            capacity: 16,
            entry_ttl_ms: 600_000,
        };
        let registry = RateLimitRegistry::with_clock(&config, ManualClock::new(0));

        for i in 0..200 {
            registry.check_and_consume(&format!("browse:10.0.0.{}", i), 10, 60_000);
        }
        registry.run_pending_tasks();

        assert_eq!(registry.capacity(), 16);
        assert_eq!(registry.entry_ttl(), Duration::from_secs(600));
        assert!(registry.entry_count() <= 16);
    }

    #[test]
    fn test_run_with_limit_skips_action_when_rejected() {
        let registry = test_registry(&ManualClock::new(0));
        let calls = AtomicU32::new(0);

        let first = registry.run_with_limit("k", 1, 60_000, || calls.fetch_add(1, Ordering::SeqCst));
        assert_eq!(first, Ok(0));

        let second = registry.run_with_limit("k", 1, 60_000, || calls.fetch_add(1, Ordering::SeqCst));
        assert!(second.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[derive(Debug, PartialEq)]
    enum ActionError {
        Limited(u64),
        Downstream(&'static str),
    }

    impl From<RateLimitExceeded> for ActionError {
        fn from(err: RateLimitExceeded) -> Self {
            ActionError::Limited(err.retry_after_secs)
        }
    }

    #[test]
    fn test_try_run_propagates_action_error_and_keeps_consumption() {
        let clock = ManualClock::new(0);
        let registry = test_registry(&clock);

        let result: Result<(), ActionError> =
            registry.try_run_with_limit("checkout:u1", 1, 60_000, || Err(ActionError::Downstream("card declined")));
        assert_eq!(result, Err(ActionError::Downstream("card declined")));

        clock.set(30_000);
        let result: Result<(), ActionError> =
            registry.try_run_with_limit("checkout:u1", 1, 60_000, || Ok(()));
        assert_eq!(result, Err(ActionError::Limited(30)));
    }

    #[test]
    fn test_concurrent_callers_never_exceed_limit() {
        let registry = Arc::new(test_registry(&ManualClock::new(0)));
        let granted = Arc::new(AtomicU32::new(0));

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let registry = Arc::clone(&registry);
                let granted = Arc::clone(&granted);
                scope.spawn(move || {
                    for _ in 0..50 {
                        if registry.check_and_consume("hot:key", 100, 60_000).allowed {
                            granted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(granted.load(Ordering::SeqCst), 100);
    }
}
