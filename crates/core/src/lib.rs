//! Papertrade Core - market data acquisition and caching.
//!
//! This crate supplies every price lookup of the paper-trading dashboard. It
//! is database-agnostic and defines the store traits implemented by the
//! `storage-sqlite` crate.
//!
//! - [`MarketDataGateway`] - the only entry point other subsystems call
//! - [`RateLimiter`] - shared upstream call budget, fails closed
//! - [`HotCache`] / [`MemoryHotCache`] - short-TTL read cache
//! - [`WarmStore`] - authoritative price history and latest rows
//! - [`WatchlistManager`] / [`WatchlistScheduler`] - background refresh

pub mod config;
pub mod errors;
pub mod hot_cache;
pub mod market_data;
pub mod rate_limit;
pub mod watchlist;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{MarketDataConfig, RateLimitConfig, SchedulerConfig, UpstreamConfig};
pub use hot_cache::{HotCache, MemoryHotCache};
pub use market_data::{GatewayError, MarketDataGateway, WarmStore};
pub use rate_limit::{
    CallWindow, InMemoryRateLimitStore, RateLimitStore, RateLimitUsage, RateLimiter,
};
pub use watchlist::{
    RefreshReport, WatchlistEntry, WatchlistManager, WatchlistPriority, WatchlistScheduler,
    WatchlistStore,
};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
