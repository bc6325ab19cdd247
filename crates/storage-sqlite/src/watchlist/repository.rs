use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use super::model::WatchlistEntryDB;
use crate::db::{with_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::ticker_watchlist::dsl;
use papertrade_core::watchlist::{WatchlistEntry, WatchlistPriority, WatchlistStore};
use papertrade_core::Result;
use papertrade_market_data::Ticker;

pub struct WatchlistRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl WatchlistRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl WatchlistStore for WatchlistRepository {
    async fn upsert_entry(
        &self,
        ticker: &Ticker,
        priority: WatchlistPriority,
    ) -> Result<WatchlistEntry> {
        let now = Utc::now().naive_utc();
        let row = WatchlistEntryDB {
            ticker: ticker.to_string(),
            last_refreshed_at: None,
            priority: priority.rank(),
            created_at: now,
            updated_at: now,
        };

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<WatchlistEntry> {
                diesel::insert_into(dsl::ticker_watchlist)
                    .values(&row)
                    .on_conflict(dsl::ticker)
                    .do_update()
                    .set((dsl::priority.eq(row.priority), dsl::updated_at.eq(now)))
                    .execute(conn)
                    .into_core()?;

                let stored = dsl::ticker_watchlist
                    .find(&row.ticker)
                    .select(WatchlistEntryDB::as_select())
                    .first(conn)
                    .into_core()?;
                WatchlistEntry::try_from(stored).into_core()
            })
            .await
    }

    async fn remove_entry(&self, ticker: &Ticker) -> Result<bool> {
        let ticker = ticker.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let removed = diesel::delete(dsl::ticker_watchlist.find(ticker))
                    .execute(conn)
                    .into_core()?;
                Ok(removed > 0)
            })
            .await
    }

    async fn list_entries(&self) -> Result<Vec<WatchlistEntry>> {
        with_connection(&self.pool, |conn| {
            let rows = dsl::ticker_watchlist
                .order((dsl::priority.asc(), dsl::ticker.asc()))
                .select(WatchlistEntryDB::as_select())
                .load(conn)
                .into_core()?;
            rows.into_iter()
                .map(WatchlistEntry::try_from)
                .collect::<std::result::Result<Vec<_>, StorageError>>()
                .into_core()
        })
        .await
    }

    async fn mark_refreshed(&self, ticker: &Ticker, at: DateTime<Utc>) -> Result<()> {
        let ticker = ticker.to_string();
        let at = at.naive_utc();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::update(dsl::ticker_watchlist.find(ticker))
                    .set((dsl::last_refreshed_at.eq(Some(at)), dsl::updated_at.eq(at)))
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open, spawn_writer};
    use chrono::TimeZone;
    use papertrade_core::watchlist::WatchlistManager;
    use tempfile::TempDir;

    fn setup() -> (TempDir, WatchlistRepository) {
        let dir = tempfile::tempdir().unwrap();
        let pool = open(dir.path().join("watchlist.db").to_str().unwrap()).unwrap();
        let writer = spawn_writer(&pool).unwrap();
        (dir, WatchlistRepository::new(pool, writer))
    }

    #[tokio::test]
    async fn test_upsert_keeps_refresh_time_and_updates_priority() {
        let (_dir, repo) = setup();
        let ticker = Ticker::new("AAPL");
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let entry = repo.upsert_entry(&ticker, WatchlistPriority::Cold).await.unwrap();
        assert_eq!(entry.last_refreshed_at, None);

        repo.mark_refreshed(&ticker, at).await.unwrap();
        let entry = repo
            .upsert_entry(&ticker, WatchlistPriority::ActivePortfolio)
            .await
            .unwrap();
        assert_eq!(entry.priority, WatchlistPriority::ActivePortfolio);
        assert_eq!(entry.last_refreshed_at, Some(at));
        assert_eq!(repo.list_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_reports_whether_present() {
        let (_dir, repo) = setup();
        let ticker = Ticker::new("MSFT");
        repo.upsert_entry(&ticker, WatchlistPriority::Watched).await.unwrap();

        assert!(repo.remove_entry(&ticker).await.unwrap());
        assert!(!repo.remove_entry(&ticker).await.unwrap());
        assert!(repo.list_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_refreshed_ignores_unknown_ticker() {
        let (_dir, repo) = setup();
        repo.mark_refreshed(&Ticker::new("NOPE"), Utc::now()).await.unwrap();
        assert!(repo.list_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manager_orders_persisted_entries() {
        let (_dir, repo) = setup();
        let manager = WatchlistManager::new(Arc::new(repo));
        let yesterday = Utc::now() - chrono::Duration::days(1);

        manager.track(&"COLD".into(), WatchlistPriority::Cold).await.unwrap();
        manager.track(&"OLD".into(), WatchlistPriority::Watched).await.unwrap();
        manager.track(&"NEW".into(), WatchlistPriority::Watched).await.unwrap();
        manager
            .track(&"HELD".into(), WatchlistPriority::ActivePortfolio)
            .await
            .unwrap();
        manager.record_refresh(&"OLD".into(), yesterday).await.unwrap();

        let batch = manager.select_next_batch(3).await.unwrap();
        let symbols: Vec<&str> = batch.iter().map(|t| t.as_str()).collect();
        assert_eq!(symbols, vec!["HELD", "NEW", "OLD"]);
    }
}
