use async_trait::async_trait;
use chrono::{DateTime, Utc};
use papertrade_market_data::{PricePoint, Ticker};

use crate::errors::Result;

/// Durable price history plus one "latest" row per ticker.
///
/// The warm store is the authoritative tier. Every point it returns carries
/// source `warm`.
#[async_trait]
pub trait WarmStore: Send + Sync {
    /// Idempotently store `points`, keyed by ticker and timestamp.
    ///
    /// The latest row of a ticker is replaced only by a point whose timestamp
    /// is at least the stored one, so a slow writer can never roll it back.
    /// Returns the number of history rows written.
    async fn upsert_batch(&self, points: &[PricePoint]) -> Result<usize>;

    async fn get_latest(&self, ticker: &Ticker) -> Result<Option<PricePoint>>;

    /// Points with `start <= timestamp <= end`, ascending by timestamp.
    async fn get_range(
        &self,
        ticker: &Ticker,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>>;
}
