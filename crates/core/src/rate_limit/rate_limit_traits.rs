use async_trait::async_trait;

use super::rate_limit_model::{CallWindow, RateLimitUsage};
use crate::config::RateLimitConfig;
use crate::errors::Result;

/// Externally persisted call counters shared by every worker.
///
/// Implementations must make [`try_record_call`](Self::try_record_call) atomic
/// across all processes that share the store: the ceiling check and the
/// insert happen as one unit, or concurrent workers can overspend.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Prune calls at or before `window.window_start`, then record a call at
    /// `window.now` if neither ceiling in `limits` is reached.
    ///
    /// Returns whether the call was recorded.
    async fn try_record_call(&self, window: CallWindow, limits: &RateLimitConfig)
        -> Result<bool>;

    /// Calls counted against `window` without recording anything.
    async fn usage(&self, window: CallWindow) -> Result<RateLimitUsage>;
}
