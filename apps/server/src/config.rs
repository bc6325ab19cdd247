use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use papertrade_core::MarketDataConfig;
use papertrade_market_data::Ticker;

pub struct Config {
    pub db_path: String,
    pub market_data: MarketDataConfig,
    /// Tickers tracked as watched at startup.
    pub watchlist: Vec<Ticker>,
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source, falling back to
    /// the core defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut market_data = MarketDataConfig::default();

        market_data.rate_limit.calls_per_minute = parse_or(
            &lookup,
            "PT_CALLS_PER_MINUTE",
            market_data.rate_limit.calls_per_minute,
        )?;
        market_data.rate_limit.calls_per_day =
            parse_or(&lookup, "PT_CALLS_PER_DAY", market_data.rate_limit.calls_per_day)?;
        market_data.hot_cache_ttl = secs_or(&lookup, "PT_HOT_CACHE_TTL_SECS", market_data.hot_cache_ttl)?;
        market_data.max_age = secs_or(&lookup, "PT_MAX_AGE_SECS", market_data.max_age)?;
        if let Some(raw) = lookup("PT_WARM_REFRESH_AFTER_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid PT_WARM_REFRESH_AFTER_SECS: {raw}"))?;
            market_data.warm_refresh_after = Some(Duration::from_secs(secs));
        }

        market_data.upstream.api_key = lookup("PT_ALPHA_VANTAGE_API_KEY").unwrap_or_default();
        if let Some(url) = lookup("PT_ALPHA_VANTAGE_URL") {
            market_data.upstream.base_url = url;
        }
        market_data.upstream.timeout =
            secs_or(&lookup, "PT_UPSTREAM_TIMEOUT_SECS", market_data.upstream.timeout)?;
        market_data.scheduler.interval = secs_or(
            &lookup,
            "PT_SCHEDULER_INTERVAL_SECS",
            market_data.scheduler.interval,
        )?;

        let db_path = lookup("PT_DB_PATH").unwrap_or_else(|| "./db/market.db".into());
        let watchlist = lookup("PT_WATCHLIST")
            .unwrap_or_default()
            .split(',')
            .map(Ticker::new)
            .filter(|t| !t.is_empty())
            .collect();
        let log_format = lookup("PT_LOG_FORMAT").unwrap_or_else(|| "text".into());

        Ok(Self {
            db_path,
            market_data,
            watchlist,
            log_format,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key}: {raw}")),
        None => Ok(default),
    }
}

fn secs_or<F>(lookup: &F, key: &str, default: Duration) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.db_path, "./db/market.db");
        assert_eq!(config.market_data, MarketDataConfig::default());
        assert!(config.watchlist.is_empty());
        assert_eq!(config.log_format, "text");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PT_CALLS_PER_MINUTE", "75"),
            ("PT_CALLS_PER_DAY", "7500"),
            ("PT_MAX_AGE_SECS", "3600"),
            ("PT_WARM_REFRESH_AFTER_SECS", "600"),
            ("PT_ALPHA_VANTAGE_API_KEY", "demo"),
            ("PT_WATCHLIST", "aapl, msft,,nvda "),
        ])
        .unwrap();

        assert_eq!(config.market_data.rate_limit.calls_per_minute, 75);
        assert_eq!(config.market_data.rate_limit.calls_per_day, 7500);
        assert_eq!(config.market_data.max_age, Duration::from_secs(3600));
        assert_eq!(
            config.market_data.warm_refresh_after,
            Some(Duration::from_secs(600))
        );
        assert_eq!(config.market_data.upstream.api_key, "demo");
        let symbols: Vec<&str> = config.watchlist.iter().map(|t| t.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT", "NVDA"]);
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let err = config_from(&[("PT_CALLS_PER_MINUTE", "five")])
            .err()
            .unwrap();
        assert!(err.to_string().contains("PT_CALLS_PER_MINUTE"));
    }
}
