//! Named rate limit policies.
//!
//! Each side-effecting action (enrolling, posting a review, starting a
//! checkout) gets its own `{limit, window_ms}` pair. Policies are plain data,
//! loaded once at startup and validated before any request is served.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{CoursekitError, Result};

/// A fixed-window quota: at most `limit` units per `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Units allowed per window
    pub limit: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl RateLimitPolicy {
    pub const fn new(limit: u32, window_ms: u64) -> Self {
        Self { limit, window_ms }
    }

    /// `limit` units per minute.
    pub const fn per_minute(limit: u32) -> Self {
        Self::new(limit, 60_000)
    }

    /// `limit` units per hour.
    pub const fn per_hour(limit: u32) -> Self {
        Self::new(limit, 3_600_000)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if self.limit == 0 {
            return Err(CoursekitError::Config(format!(
                "policy '{}': limit must be at least 1",
                name
            )));
        }
        if self.window_ms == 0 {
            return Err(CoursekitError::Config(format!(
                "policy '{}': window_ms must be at least 1",
                name
            )));
        }
        Ok(())
    }
}

/// Policies indexed by action name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicySet {
    policies: BTreeMap<String, RateLimitPolicy>,
}

impl Default for PolicySet {
    fn default() -> Self {
        let mut set = Self::empty();
        set.insert("enroll", RateLimitPolicy::per_minute(5));
        set.insert("create_review", RateLimitPolicy::per_minute(10));
        set.insert("checkout", RateLimitPolicy::per_minute(5));
        set.insert("instructor_application", RateLimitPolicy::per_hour(3));
        set
    }
}

impl PolicySet {
    /// A set with no policies.
    pub fn empty() -> Self {
        Self {
            policies: BTreeMap::new(),
        }
    }

    /// Load policies from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limit policies");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse policies from a YAML mapping of action name to policy.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let set: PolicySet = serde_yaml::from_str(yaml).map_err(|e| {
            CoursekitError::Config(format!("Failed to parse rate limit policies: {}", e))
        })?;
        set.validate()?;
        Ok(set)
    }

    pub fn insert(&mut self, action: impl Into<String>, policy: RateLimitPolicy) {
        self.policies.insert(action.into(), policy);
    }

    pub fn get(&self, action: &str) -> Option<&RateLimitPolicy> {
        self.policies.get(action)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RateLimitPolicy)> {
        self.policies.iter().map(|(name, policy)| (name.as_str(), policy))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Check every policy in the set.
    pub fn validate(&self) -> Result<()> {
        self.iter().try_for_each(|(name, policy)| policy.validate(name))
    }
}
