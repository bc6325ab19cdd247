//! Market data configuration.
//!
//! The composition root builds one [`MarketDataConfig`] and hands it to every
//! component at construction time. Durations are read and written as whole
//! seconds (`*_secs` keys).

use std::time::Duration;

use papertrade_market_data::provider::alpha_vantage::DEFAULT_BASE_URL;
use papertrade_market_data::RetryPolicy;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Upstream call budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Ceiling for any trailing 60-second window.
    pub calls_per_minute: u32,
    /// Ceiling per UTC calendar day.
    pub calls_per_day: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls_per_minute: 5,
            calls_per_day: 500,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(rename = "timeout_secs", with = "secs")]
    pub timeout: Duration,
    pub currency: String,
    pub retry: RetryPolicy,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(10),
            currency: "USD".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    #[serde(rename = "interval_secs", with = "secs")]
    pub interval: Duration,
    #[serde(rename = "initial_delay_secs", with = "secs")]
    pub initial_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            initial_delay: Duration::from_secs(5),
        }
    }
}

/// Immutable configuration for the market data core.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    pub rate_limit: RateLimitConfig,
    #[serde(rename = "hot_cache_ttl_secs", with = "secs")]
    pub hot_cache_ttl: Duration,
    /// Age at which a price counts as stale.
    #[serde(rename = "max_age_secs", with = "secs")]
    pub max_age: Duration,
    /// Optional tighter window for accepting warm rows without asking upstream.
    #[serde(rename = "warm_refresh_after_secs", with = "opt_secs")]
    pub warm_refresh_after: Option<Duration>,
    pub upstream: UpstreamConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            hot_cache_ttl: Duration::from_secs(60),
            max_age: Duration::from_secs(4 * 60 * 60),
            warm_refresh_after: None,
            upstream: UpstreamConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl MarketDataConfig {
    /// Reject settings the core cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.calls_per_minute == 0 {
            return Err(Error::InvalidConfigValue(
                "calls_per_minute must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit.calls_per_day == 0 {
            return Err(Error::InvalidConfigValue(
                "calls_per_day must be greater than zero".to_string(),
            ));
        }
        if self.max_age.is_zero() {
            return Err(Error::InvalidConfigValue(
                "max_age must be greater than zero".to_string(),
            ));
        }
        if self.scheduler.interval.is_zero() {
            return Err(Error::InvalidConfigValue(
                "scheduler interval must be greater than zero".to_string(),
            ));
        }
        if self.upstream.api_key.trim().is_empty() {
            return Err(Error::InvalidConfigValue(
                "upstream api_key is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Window within which a warm row is served without an upstream attempt.
    pub fn warm_acceptance_window(&self) -> Duration {
        match self.warm_refresh_after {
            Some(refresh) => refresh.min(self.max_age),
            None => self.max_age,
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod opt_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<u64>::deserialize(deserializer).map(|v| v.map(Duration::from_secs))
    }
}
