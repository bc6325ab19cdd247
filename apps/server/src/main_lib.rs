use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use papertrade_core::{
    MarketDataGateway, MemoryHotCache, RateLimiter, WatchlistManager, WatchlistPriority,
};
use papertrade_market_data::{AlphaVantageClient, RetryingClient, Ticker};
use papertrade_storage_sqlite::{
    db, MarketDataRepository, SqliteRateLimitStore, WatchlistRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub gateway: MarketDataGateway,
    pub watchlist: WatchlistManager,
    /// Concrete handle on the gateway's hot tier, kept for expiry sweeps.
    pub hot_cache: Arc<MemoryHotCache>,
    pub db_path: String,
}

pub fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    config
        .market_data
        .validate()
        .context("Invalid market data configuration")?;

    let pool = db::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path))?;
    let writer = db::spawn_writer(&pool)?;

    let upstream_config = &config.market_data.upstream;
    let upstream = RetryingClient::new(
        AlphaVantageClient::new(
            upstream_config.base_url.clone(),
            upstream_config.api_key.clone(),
            upstream_config.timeout,
            upstream_config.currency.clone(),
        ),
        upstream_config.retry.clone(),
    );

    let limiter = RateLimiter::new(
        Arc::new(SqliteRateLimitStore::new(Arc::clone(&pool))),
        config.market_data.rate_limit,
    );
    let hot_cache = Arc::new(MemoryHotCache::new());
    let gateway = MarketDataGateway::new(
        &config.market_data,
        hot_cache.clone(),
        Arc::new(MarketDataRepository::new(Arc::clone(&pool), writer.clone())),
        Arc::new(upstream),
        limiter,
    );

    let watchlist = WatchlistManager::new(Arc::new(WatchlistRepository::new(pool, writer)));
    let known: HashSet<Ticker> = watchlist
        .entries()
        .await?
        .into_iter()
        .map(|entry| entry.ticker)
        .collect();
    let mut added = 0;
    for ticker in config.watchlist.iter().filter(|t| !known.contains(*t)) {
        watchlist.track(ticker, WatchlistPriority::Watched).await?;
        added += 1;
    }
    if added > 0 {
        tracing::info!("Tracking {} new watchlist tickers from config", added);
    }

    Ok(Arc::new(AppState {
        gateway,
        watchlist,
        hot_cache,
        db_path: config.db_path.clone(),
    }))
}
