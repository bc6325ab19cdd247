//! Watchlist bookkeeping and refresh selection.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use papertrade_market_data::Ticker;

use super::watchlist_model::{WatchlistEntry, WatchlistPriority};
use super::watchlist_traits::WatchlistStore;
use crate::errors::Result;

/// Decides which tickers the background refresh visits next.
///
/// Selection is a strict priority: every active-portfolio ticker comes before
/// any watched ticker, and every watched ticker before any cold one. Within a
/// tier the stalest entry goes first.
#[derive(Clone)]
pub struct WatchlistManager {
    store: Arc<dyn WatchlistStore>,
}

impl WatchlistManager {
    pub fn new(store: Arc<dyn WatchlistStore>) -> Self {
        Self { store }
    }

    pub async fn track(&self, ticker: &Ticker, priority: WatchlistPriority) -> Result<WatchlistEntry> {
        debug!("Tracking {} as {}", ticker, priority);
        self.store.upsert_entry(ticker, priority).await
    }

    pub async fn untrack(&self, ticker: &Ticker) -> Result<bool> {
        self.store.remove_entry(ticker).await
    }

    /// All entries in refresh order.
    pub async fn entries(&self) -> Result<Vec<WatchlistEntry>> {
        let mut entries = self.store.list_entries().await?;
        sort_for_refresh(&mut entries);
        Ok(entries)
    }

    /// Up to `limit` tickers to refresh next.
    pub async fn select_next_batch(&self, limit: usize) -> Result<Vec<Ticker>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let entries = self.entries().await?;
        Ok(entries.into_iter().take(limit).map(|e| e.ticker).collect())
    }

    /// Record a refresh attempt, successful or not.
    pub async fn record_refresh(&self, ticker: &Ticker, at: DateTime<Utc>) -> Result<()> {
        self.store.mark_refreshed(ticker, at).await
    }
}

fn sort_for_refresh(entries: &mut [WatchlistEntry]) {
    entries.sort_by(|a, b| a.refresh_order_key().cmp(&b.refresh_order_key()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockWatchlistStore;
    use chrono::{Duration, TimeZone};

    fn manager() -> (WatchlistManager, MockWatchlistStore) {
        let store = MockWatchlistStore::new();
        (WatchlistManager::new(Arc::new(store.clone())), store)
    }

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_selection_is_strict_tier_priority() {
        let (manager, _) = manager();
        manager.track(&"COLD1".into(), WatchlistPriority::Cold).await.unwrap();
        manager.track(&"WATCH1".into(), WatchlistPriority::Watched).await.unwrap();
        manager.track(&"HELD1".into(), WatchlistPriority::ActivePortfolio).await.unwrap();
        manager.track(&"HELD2".into(), WatchlistPriority::ActivePortfolio).await.unwrap();

        // Cold was never refreshed, held tickers were refreshed long ago; tier still wins
        manager.record_refresh(&"HELD1".into(), t(1)).await.unwrap();
        manager.record_refresh(&"HELD2".into(), t(2)).await.unwrap();

        let batch = manager.select_next_batch(3).await.unwrap();
        let names: Vec<&str> = batch.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, vec!["HELD1", "HELD2", "WATCH1"]);
    }

    #[tokio::test]
    async fn test_never_refreshed_first_then_oldest() {
        let (manager, _) = manager();
        for ticker in ["AAA", "BBB", "CCC", "DDD"] {
            manager.track(&ticker.into(), WatchlistPriority::Watched).await.unwrap();
        }
        manager.record_refresh(&"AAA".into(), t(5)).await.unwrap();
        manager.record_refresh(&"BBB".into(), t(3)).await.unwrap();

        let batch = manager.select_next_batch(10).await.unwrap();
        let names: Vec<&str> = batch.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, vec!["CCC", "DDD", "BBB", "AAA"]);
    }

    #[tokio::test]
    async fn test_track_changes_priority_and_keeps_refresh_time() {
        let (manager, _) = manager();
        let ticker = Ticker::new("AAPL");
        manager.track(&ticker, WatchlistPriority::Cold).await.unwrap();
        manager.record_refresh(&ticker, t(4)).await.unwrap();

        let entry = manager
            .track(&ticker, WatchlistPriority::ActivePortfolio)
            .await
            .unwrap();
        assert_eq!(entry.priority, WatchlistPriority::ActivePortfolio);
        assert_eq!(entry.last_refreshed_at, Some(t(4)));
        assert_eq!(manager.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_untrack_and_zero_limit() {
        let (manager, _) = manager();
        manager.track(&"AAPL".into(), WatchlistPriority::Watched).await.unwrap();

        assert!(manager.select_next_batch(0).await.unwrap().is_empty());
        assert!(manager.untrack(&"AAPL".into()).await.unwrap());
        assert!(!manager.untrack(&"AAPL".into()).await.unwrap());
        assert!(manager.select_next_batch(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_refresh_moves_entry_to_back_of_tier() {
        let (manager, _) = manager();
        manager.track(&"AAA".into(), WatchlistPriority::Watched).await.unwrap();
        manager.track(&"BBB".into(), WatchlistPriority::Watched).await.unwrap();

        let now = t(9);
        manager.record_refresh(&"AAA".into(), now).await.unwrap();
        manager
            .record_refresh(&"BBB".into(), now - Duration::minutes(1))
            .await
            .unwrap();

        let batch = manager.select_next_batch(1).await.unwrap();
        assert_eq!(batch[0].as_str(), "BBB");
    }
}
