use async_trait::async_trait;
use chrono::{DateTime, Utc};
use papertrade_market_data::Ticker;

use super::watchlist_model::{WatchlistEntry, WatchlistPriority};
use crate::errors::Result;

/// Persistence for watchlist entries.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// Insert `ticker` or change its priority, keeping `last_refreshed_at`.
    async fn upsert_entry(&self, ticker: &Ticker, priority: WatchlistPriority)
        -> Result<WatchlistEntry>;

    /// Returns whether an entry was removed.
    async fn remove_entry(&self, ticker: &Ticker) -> Result<bool>;

    async fn list_entries(&self) -> Result<Vec<WatchlistEntry>>;

    /// Set `last_refreshed_at` for an existing entry. Unknown tickers are ignored.
    async fn mark_refreshed(&self, ticker: &Ticker, at: DateTime<Utc>) -> Result<()>;
}
