//! Rate limiting state and policies.

mod clock;
mod counter;
mod key;
mod policy;
mod registry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::{RateLimitDecision, RateLimitRecord};
pub use key::RateLimitKey;
pub use policy::{PolicySet, RateLimitPolicy};
pub use registry::RateLimitRegistry;
