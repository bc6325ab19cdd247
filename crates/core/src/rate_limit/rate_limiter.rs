//! Upstream call budget enforcement.
//!
//! Two independent ceilings apply to every upstream call: N calls in any
//! trailing 60-second window and M calls per UTC calendar day. Counters live
//! in a [`RateLimitStore`] so every worker draws from one budget.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::rate_limit_model::{CallWindow, RateLimitUsage};
use super::rate_limit_traits::RateLimitStore;
use crate::config::RateLimitConfig;
use crate::errors::Result;

/// Non-blocking rate limiter over a shared store.
///
/// Every operation fails closed: when the store cannot be reached no call
/// is permitted and the remaining budget reads as zero.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    limits: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, limits: RateLimitConfig) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> &RateLimitConfig {
        &self.limits
    }

    /// Try to spend one call. Never waits.
    pub async fn try_acquire(&self) -> bool {
        self.try_acquire_at(Utc::now()).await
    }

    pub async fn try_acquire_at(&self, now: DateTime<Utc>) -> bool {
        match self
            .store
            .try_record_call(CallWindow::at(now), &self.limits)
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                debug!(
                    "Rate limit reached ({}/min, {}/day), denying upstream call",
                    self.limits.calls_per_minute, self.limits.calls_per_day
                );
                false
            }
            Err(e) => {
                warn!("Rate limit store unavailable, denying upstream call: {}", e);
                false
            }
        }
    }

    pub async fn usage(&self) -> Result<RateLimitUsage> {
        self.usage_at(Utc::now()).await
    }

    pub async fn usage_at(&self, now: DateTime<Utc>) -> Result<RateLimitUsage> {
        self.store.usage(CallWindow::at(now)).await
    }

    /// Calls still available right now: the smaller of the window and daily
    /// remainders.
    pub async fn remaining_budget(&self) -> u32 {
        self.remaining_budget_at(Utc::now()).await
    }

    pub async fn remaining_budget_at(&self, now: DateTime<Utc>) -> u32 {
        match self.usage_at(now).await {
            Ok(usage) => {
                let window_left = self.limits.calls_per_minute.saturating_sub(usage.window_used);
                let day_left = self.limits.calls_per_day.saturating_sub(usage.day_used);
                window_left.min(day_left)
            }
            Err(e) => {
                warn!("Rate limit store unavailable, reporting no budget: {}", e);
                0
            }
        }
    }
}
