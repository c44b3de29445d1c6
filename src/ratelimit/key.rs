//! Rate limit key construction.

use std::fmt;

/// A key that identifies one quota: an action performed by one subject.
///
/// The subject is usually a client IP or a user id. Keys render as
/// `"<action>:<subject>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    /// The action being limited, e.g. `create_review`
    pub action: String,
    /// Who is performing it
    pub subject: String,
}

impl RateLimitKey {
    pub fn new(action: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            subject: subject.into(),
        }
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action, self.subject)
    }
}
