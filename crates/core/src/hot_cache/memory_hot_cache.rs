//! In-process hot cache backed by a concurrent map.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;
use papertrade_market_data::{PricePoint, PriceSource, Ticker};

use super::hot_cache_traits::HotCache;
use crate::errors::Result;

#[derive(Debug, Clone)]
struct CachedPoint {
    point: PricePoint,
    expires_at: Instant,
}

impl CachedPoint {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// [`HotCache`] held in process memory.
///
/// Entries expire lazily on read; call [`purge_expired`](Self::purge_expired)
/// periodically to reclaim memory for tickers nobody reads.
#[derive(Debug, Default)]
pub struct MemoryHotCache {
    entries: DashMap<Ticker, CachedPoint>,
}

impl MemoryHotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, cached| !cached.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!("Hot cache purged {} expired entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl HotCache for MemoryHotCache {
    async fn get(&self, ticker: &Ticker) -> Result<Option<PricePoint>> {
        let now = Instant::now();
        if let Some(cached) = self.entries.get(ticker) {
            if !cached.is_expired(now) {
                return Ok(Some(cached.point.clone().with_source(PriceSource::Hot)));
            }
        }
        self.entries.remove_if(ticker, |_, cached| cached.is_expired(now));
        Ok(None)
    }

    async fn set(&self, ticker: &Ticker, point: PricePoint, ttl: Duration) -> Result<()> {
        let cached = CachedPoint {
            point,
            expires_at: Instant::now() + ttl,
        };

        match self.entries.entry(ticker.clone()) {
            Entry::Occupied(mut existing) => {
                if existing.get().point.timestamp > cached.point.timestamp {
                    debug!(
                        "Hot cache keeps newer {} point ({} > {})",
                        ticker,
                        existing.get().point.timestamp,
                        cached.point.timestamp
                    );
                    return Ok(());
                }
                existing.insert(cached);
            }
            Entry::Vacant(slot) => {
                slot.insert(cached);
            }
        }
        Ok(())
    }
}
