use std::time::Duration;

use async_trait::async_trait;
use papertrade_market_data::{PricePoint, Ticker};

use crate::errors::Result;

/// Low-latency price cache. Not authoritative.
///
/// Anything it loses must be recoverable from the warm store or upstream, so
/// implementations may evict at will. Errors should be reported as
/// [`Error::CacheUnavailable`](crate::Error::CacheUnavailable); the gateway
/// treats them as a miss.
#[async_trait]
pub trait HotCache: Send + Sync {
    /// Cached point for `ticker`, tagged with source `hot`, if present and
    /// not expired.
    async fn get(&self, ticker: &Ticker) -> Result<Option<PricePoint>>;

    /// Cache `point` under `ticker` for `ttl`.
    ///
    /// A point older than the one already cached is ignored.
    async fn set(&self, ticker: &Ticker, point: PricePoint, ttl: Duration) -> Result<()>;
}
