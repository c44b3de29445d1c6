//! Page size normalization.

use serde::{Deserialize, Serialize};

use crate::error::{CoursekitError, Result};

/// Allowed page sizes for one listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitBounds {
    /// Smallest page size a caller can get
    pub min: u32,
    /// Largest page size a caller can get
    pub max: u32,
    /// Page size used when the caller does not ask for one
    pub default: u32,
}

impl LimitBounds {
    pub const fn new(min: u32, max: u32, default: u32) -> Self {
        Self { min, max, default }
    }

    /// Bounds must satisfy `1 <= min <= default <= max`.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.min == 0 {
            return Err(CoursekitError::Config(format!(
                "listing '{}': min must be at least 1",
                name
            )));
        }
        if self.min > self.max {
            return Err(CoursekitError::Config(format!(
                "listing '{}': min {} exceeds max {}",
                name, self.min, self.max
            )));
        }
        if self.default < self.min || self.default > self.max {
            return Err(CoursekitError::Config(format!(
                "listing '{}': default {} is outside [{}, {}]",
                name, self.default, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Resolve a requested page size against `bounds`.
///
/// A missing or zero request yields the default; anything else is clamped
/// into `[min, max]`, so negative sizes become `min`.
pub fn normalize_limit(requested: Option<i64>, bounds: &LimitBounds) -> u32 {
    match requested {
        None | Some(0) => bounds.default,
        Some(n) => {
            let clamped = n.max(i64::from(bounds.min)).min(i64::from(bounds.max));
            // In range of u32 after clamping to u32 bounds.
            u32::try_from(clamped).unwrap_or(bounds.min)
        }
    }
}

/// Number of rows to fetch so the page can tell whether another one follows.
pub fn overfetch_limit(limit: u32) -> u32 {
    limit.saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const COURSES: LimitBounds = LimitBounds::new(1, 50, 12);

    #[test]
    fn test_normalize_limit_examples() {
        assert_eq!(normalize_limit(None, &COURSES), 12);
        assert_eq!(normalize_limit(Some(0), &COURSES), 12);
        assert_eq!(normalize_limit(Some(-5), &COURSES), 1);
        assert_eq!(normalize_limit(Some(999), &COURSES), 50);
        assert_eq!(normalize_limit(Some(20), &COURSES), 20);
        assert_eq!(normalize_limit(Some(i64::MIN), &COURSES), 1);
        assert_eq!(normalize_limit(Some(i64::MAX), &COURSES), 50);
    }

    #[test]
    fn test_overfetch_limit() {
        assert_eq!(overfetch_limit(12), 13);
        assert_eq!(overfetch_limit(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_validate_bounds() {
        assert!(COURSES.validate("courses").is_ok());
        assert!(LimitBounds::new(0, 10, 5).validate("x").is_err());
        assert!(LimitBounds::new(10, 5, 7).validate("x").is_err());
        assert!(LimitBounds::new(1, 10, 20).validate("x").is_err());
    }

    fn valid_bounds() -> impl Strategy<Value = LimitBounds> {
        (1u32..1_000, 0u32..1_000, 0u32..1_000).prop_map(|(min, span, offset)| {
            let max = min + span;
            let default = min + offset % (span + 1);
            LimitBounds::new(min, max, default)
        })
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(requested in proptest::option::of(any::<i64>()), bounds in valid_bounds()) {
            let once = normalize_limit(requested, &bounds);
            let twice = normalize_limit(Some(i64::from(once)), &bounds);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_normalize_stays_in_bounds(requested in proptest::option::of(any::<i64>()), bounds in valid_bounds()) {
            let limit = normalize_limit(requested, &bounds);
            prop_assert!(limit >= bounds.min && limit <= bounds.max);
        }
    }
}
