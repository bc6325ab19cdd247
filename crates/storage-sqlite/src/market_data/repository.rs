use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel::upsert::excluded;
use log::debug;

use super::model::{LatestPriceDB, PriceHistoryDB};
use crate::db::{with_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::latest_prices::dsl as latest_dsl;
use crate::schema::price_history::dsl as history_dsl;
use papertrade_core::market_data::WarmStore;
use papertrade_core::Result;
use papertrade_market_data::{PricePoint, Ticker};

/// SQLite-backed warm tier.
///
/// Writes go through the process writer; reads use pooled connections on
/// the blocking thread pool.
pub struct MarketDataRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl MarketDataRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

/// Newest point per ticker in a batch.
fn newest_per_ticker(points: &[PricePoint]) -> Vec<&PricePoint> {
    let mut newest: HashMap<&Ticker, &PricePoint> = HashMap::new();
    for point in points {
        newest
            .entry(&point.ticker)
            .and_modify(|current| {
                if point.timestamp >= current.timestamp {
                    *current = point;
                }
            })
            .or_insert(point);
    }
    newest.into_values().collect()
}

fn upsert_history(conn: &mut SqliteConnection, row: &PriceHistoryDB) -> Result<usize> {
    diesel::insert_into(history_dsl::price_history)
        .values(row)
        .on_conflict((history_dsl::ticker, history_dsl::timestamp))
        .do_update()
        .set((
            history_dsl::price.eq(excluded(history_dsl::price)),
            history_dsl::currency.eq(excluded(history_dsl::currency)),
            history_dsl::open.eq(excluded(history_dsl::open)),
            history_dsl::high.eq(excluded(history_dsl::high)),
            history_dsl::low.eq(excluded(history_dsl::low)),
            history_dsl::close.eq(excluded(history_dsl::close)),
            history_dsl::volume.eq(excluded(history_dsl::volume)),
        ))
        .execute(conn)
        .into_core()
}

/// Replace the latest row unless the stored one is newer.
///
/// Runs inside the writer's `IMMEDIATE` transaction, so the read and the
/// write cannot interleave with another process.
fn advance_latest(conn: &mut SqliteConnection, row: &LatestPriceDB) -> Result<bool> {
    let stored = latest_dsl::latest_prices
        .filter(latest_dsl::ticker.eq(&row.ticker))
        .select(latest_dsl::timestamp)
        .first::<chrono::NaiveDateTime>(conn)
        .optional()
        .into_core()?;

    if matches!(stored, Some(stored) if stored > row.timestamp) {
        debug!(
            "Keeping newer latest price for {} ({:?} > {})",
            row.ticker, stored, row.timestamp
        );
        return Ok(false);
    }

    diesel::replace_into(latest_dsl::latest_prices)
        .values(row)
        .execute(conn)
        .into_core()?;
    Ok(true)
}

#[async_trait]
impl WarmStore for MarketDataRepository {
    async fn upsert_batch(&self, points: &[PricePoint]) -> Result<usize> {
        if points.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().naive_utc();
        let history_rows: Vec<PriceHistoryDB> = points
            .iter()
            .map(|p| PriceHistoryDB::from_point(p, now))
            .collect();
        let latest_rows: Vec<LatestPriceDB> = newest_per_ticker(points)
            .into_iter()
            .map(|p| LatestPriceDB::from_point(p, now))
            .collect();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut written = 0;
                for row in &history_rows {
                    written += upsert_history(conn, row)?;
                }
                for row in &latest_rows {
                    advance_latest(conn, row)?;
                }
                Ok(written)
            })
            .await
    }

    async fn get_latest(&self, ticker: &Ticker) -> Result<Option<PricePoint>> {
        let ticker = ticker.to_string();
        with_connection(&self.pool, move |conn| {
            let row = latest_dsl::latest_prices
                .filter(latest_dsl::ticker.eq(&ticker))
                .select(LatestPriceDB::as_select())
                .first(conn)
                .optional()
                .into_core()?;
            row.map(LatestPriceDB::into_point).transpose().into_core()
        })
        .await
    }

    async fn get_range(
        &self,
        ticker: &Ticker,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        if start > end {
            return Ok(Vec::new());
        }
        let ticker = ticker.to_string();
        let (start, end) = (start.naive_utc(), end.naive_utc());

        with_connection(&self.pool, move |conn| {
            let rows = history_dsl::price_history
                .filter(history_dsl::ticker.eq(&ticker))
                .filter(history_dsl::timestamp.ge(start))
                .filter(history_dsl::timestamp.le(end))
                .order(history_dsl::timestamp.asc())
                .select(PriceHistoryDB::as_select())
                .load(conn)
                .into_core()?;
            rows.into_iter()
                .map(PriceHistoryDB::into_point)
                .collect::<std::result::Result<Vec<_>, StorageError>>()
                .into_core()
        })
        .await
    }
}
