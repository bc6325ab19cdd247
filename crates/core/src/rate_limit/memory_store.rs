//! Process-local rate limit store.
//!
//! Counters live in this process only. Use it for tests and single-process
//! deployments; any setup with more than one worker process needs a shared
//! store such as the SQLite one, or each process gets its own full budget.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::warn;

use super::rate_limit_model::{CallWindow, RateLimitUsage};
use super::rate_limit_traits::RateLimitStore;
use crate::config::RateLimitConfig;
use crate::errors::Result;

#[derive(Debug, Default)]
struct Counters {
    /// Call timestamps in insertion order.
    calls: VecDeque<DateTime<Utc>>,
    daily: BTreeMap<NaiveDate, u32>,
}

impl Counters {
    fn prune(&mut self, window: &CallWindow) {
        self.calls.retain(|t| *t > window.window_start);
        self.daily.retain(|day, _| *day >= window.day);
    }

    fn usage(&self, window: &CallWindow) -> RateLimitUsage {
        RateLimitUsage {
            window_used: self
                .calls
                .iter()
                .filter(|t| **t > window.window_start && **t <= window.now)
                .count() as u32,
            day_used: self.daily.get(&window.day).copied().unwrap_or(0),
        }
    }
}

/// In-memory [`RateLimitStore`] for a single process.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    counters: Mutex<Counters>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the counters, recovering from poison if necessary.
    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limit counters mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn try_record_call(
        &self,
        window: CallWindow,
        limits: &RateLimitConfig,
    ) -> Result<bool> {
        let mut counters = self.lock();
        counters.prune(&window);

        let usage = counters.usage(&window);
        if usage.window_used >= limits.calls_per_minute || usage.day_used >= limits.calls_per_day {
            return Ok(false);
        }

        counters.calls.push_back(window.now);
        *counters.daily.entry(window.day).or_insert(0) += 1;
        Ok(true)
    }

    async fn usage(&self, window: CallWindow) -> Result<RateLimitUsage> {
        Ok(self.lock().usage(&window))
    }
}
