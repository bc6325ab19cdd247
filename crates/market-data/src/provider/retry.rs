//! Bounded retry for transient upstream failures.
//!
//! [`RetryingClient`] wraps any [`UpstreamClient`] and repeats calls whose
//! error classifies as [`RetryClass::WithBackoff`]. Everything else is
//! returned on the first failure.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Deserialize;

use crate::errors::{MarketDataError, RetryClass};
use crate::models::{PricePoint, Ticker};
use crate::provider::UpstreamClient;

const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BASE_DELAY_MS: u64 = 250;

/// Retry configuration for transient upstream errors.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    #[serde(rename = "base_delay_ms", with = "millis")]
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Backoff before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Upstream client decorator that retries transient failures.
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: UpstreamClient> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn backoff(&self, attempt: u32, ticker: &Ticker, error: &MarketDataError) -> bool {
        if error.retry_class() != RetryClass::WithBackoff || attempt > self.policy.max_retries {
            return false;
        }
        let delay = self.policy.delay_for(attempt);
        warn!(
            "{}: transient failure for {} ({}), retry {}/{} in {:?}",
            self.inner.id(),
            ticker,
            error,
            attempt,
            self.policy.max_retries,
            delay
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        true
    }
}

#[async_trait]
impl<C: UpstreamClient> UpstreamClient for RetryingClient<C> {
    fn id(&self) -> &'static str {
        self.inner.id()
    }

    async fn fetch(&self, ticker: &Ticker) -> Result<PricePoint, MarketDataError> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch(ticker).await {
                Ok(point) => {
                    if attempt > 0 {
                        debug!("{}: {} succeeded after {} retries", self.id(), ticker, attempt);
                    }
                    return Ok(point);
                }
                Err(e) => {
                    attempt += 1;
                    if !self.backoff(attempt, ticker, &e).await {
                        return Err(e);
                    }
                }
            }
        }
    }

    async fn fetch_history(
        &self,
        ticker: &Ticker,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch_history(ticker, start, end).await {
                Ok(points) => return Ok(points),
                Err(e) => {
                    attempt += 1;
                    if !self.backoff(attempt, ticker, &e).await {
                        return Err(e);
                    }
                }
            }
        }
    }
}
