//! Rate limit module - shared upstream call budget.

mod memory_store;
mod rate_limit_model;
mod rate_limit_traits;
mod rate_limiter;

pub use memory_store::InMemoryRateLimitStore;
pub use rate_limit_model::{CallWindow, RateLimitUsage, RATE_LIMIT_WINDOW_SECS};
pub use rate_limit_traits::RateLimitStore;
pub use rate_limiter::RateLimiter;
