//! Rate limiting logic and state management.

mod backend;
mod factory;
mod limiter;
mod record;
mod shared;
mod stats;

pub use backend::RateLimiterBackend;
pub use factory::{build_rate_limiter, RateLimitHandle};
pub use limiter::RateLimiter;
pub use record::{LimiterConfig, RateLimitRecord};
pub use shared::{IdentityKeys, SharedStoreRateLimiter};
pub use stats::{Decision, GlobalStats, UserInfo, UserStats};
