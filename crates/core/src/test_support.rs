//! In-memory fakes for the tier traits, shared by unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use papertrade_market_data::{
    MarketDataError, Money, PricePoint, PriceSource, Ticker, UpstreamClient,
};
use rust_decimal::Decimal;

use crate::config::RateLimitConfig;
use crate::errors::{DatabaseError, Error, Result};
use crate::hot_cache::HotCache;
use crate::market_data::WarmStore;
use crate::rate_limit::{InMemoryRateLimitStore, RateLimiter};
use crate::watchlist::{WatchlistEntry, WatchlistPriority, WatchlistStore};

pub fn point(ticker: &str, price: Decimal, timestamp: DateTime<Utc>) -> PricePoint {
    PricePoint::new(
        ticker,
        Money::new(price, "USD"),
        timestamp,
        PriceSource::Upstream,
    )
}

pub fn limiter(calls_per_minute: u32, calls_per_day: u32) -> RateLimiter {
    RateLimiter::new(
        Arc::new(InMemoryRateLimitStore::new()),
        RateLimitConfig {
            calls_per_minute,
            calls_per_day,
        },
    )
}

// =========================================================================
// Mock WarmStore
// =========================================================================

#[derive(Clone, Default)]
pub struct MockWarmStore {
    latest: Arc<Mutex<HashMap<Ticker, PricePoint>>>,
    history: Arc<Mutex<BTreeMap<(Ticker, DateTime<Utc>), PricePoint>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MockWarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_point(self, point: PricePoint) -> Self {
        self.store(&point);
        self
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn latest_for(&self, ticker: &str) -> Option<PricePoint> {
        self.latest.lock().unwrap().get(ticker).cloned()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().unwrap().len()
    }

    fn store(&self, point: &PricePoint) {
        self.history
            .lock()
            .unwrap()
            .insert((point.ticker.clone(), point.timestamp), point.clone());

        let mut latest = self.latest.lock().unwrap();
        let replace = latest
            .get(&point.ticker)
            .map_or(true, |current| point.timestamp >= current.timestamp);
        if replace {
            latest.insert(point.ticker.clone(), point.clone());
        }
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Database(DatabaseError::ConnectionFailed(
                "Intentional read failure".into(),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl WarmStore for MockWarmStore {
    async fn upsert_batch(&self, points: &[PricePoint]) -> Result<usize> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "Intentional write failure".into(),
            )));
        }
        for point in points {
            self.store(point);
        }
        Ok(points.len())
    }

    async fn get_latest(&self, ticker: &Ticker) -> Result<Option<PricePoint>> {
        self.check_reads()?;
        Ok(self
            .latest
            .lock()
            .unwrap()
            .get(ticker)
            .map(|p| p.clone().with_source(PriceSource::Warm)))
    }

    async fn get_range(
        &self,
        ticker: &Ticker,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        self.check_reads()?;
        Ok(self
            .history
            .lock()
            .unwrap()
            .values()
            .filter(|p| &p.ticker == ticker && p.timestamp >= start && p.timestamp <= end)
            .map(|p| p.clone().with_source(PriceSource::Warm))
            .collect())
    }
}

// =========================================================================
// Mock UpstreamClient
// =========================================================================

#[derive(Clone, Copy, Debug)]
pub enum Failure {
    Timeout,
    RateLimited,
    Malformed,
}

#[derive(Clone, Default)]
pub struct MockUpstream {
    prices: Arc<Mutex<HashMap<Ticker, Decimal>>>,
    failures: Arc<Mutex<HashMap<Ticker, Failure>>>,
    history: Arc<Mutex<HashMap<Ticker, Vec<PricePoint>>>>,
    /// Per-call `(price, delay)` answers, consumed in request order.
    scripted: Arc<Mutex<HashMap<Ticker, VecDeque<(Decimal, Duration)>>>>,
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(self, ticker: &str, price: Decimal) -> Self {
        self.prices.lock().unwrap().insert(Ticker::new(ticker), price);
        self
    }

    pub fn with_failure(self, ticker: &str, failure: Failure) -> Self {
        self.failures.lock().unwrap().insert(Ticker::new(ticker), failure);
        self
    }

    pub fn with_history(self, ticker: &str, points: Vec<PricePoint>) -> Self {
        self.history.lock().unwrap().insert(Ticker::new(ticker), points);
        self
    }

    pub fn with_scripted(self, ticker: &str, answers: Vec<(Decimal, Duration)>) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .insert(Ticker::new(ticker), answers.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn error(failure: Failure) -> MarketDataError {
        let provider = "MOCK".to_string();
        match failure {
            Failure::Timeout => MarketDataError::Timeout { provider },
            Failure::RateLimited => MarketDataError::RateLimited { provider },
            Failure::Malformed => MarketDataError::Malformed {
                provider,
                message: "unexpected payload".into(),
            },
        }
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    fn id(&self) -> &'static str {
        "MOCK"
    }

    async fn fetch(&self, ticker: &Ticker) -> std::result::Result<PricePoint, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let requested_at = Utc::now();
        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(ticker)
            .and_then(|answers| answers.pop_front());
        let delay = scripted.map_or(self.delay, |(_, delay)| delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = self.failures.lock().unwrap().get(ticker).copied() {
            return Err(Self::error(failure));
        }
        let price = match scripted {
            Some((price, _)) => Some(price),
            None => self.prices.lock().unwrap().get(ticker).copied(),
        };
        match price {
            Some(price) => Ok(point(ticker.as_str(), price, requested_at)),
            None => Err(MarketDataError::SymbolNotFound(ticker.to_string())),
        }
    }

    async fn fetch_history(
        &self,
        ticker: &Ticker,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> std::result::Result<Vec<PricePoint>, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.failures.lock().unwrap().get(ticker).copied() {
            return Err(Self::error(failure));
        }
        let history = self.history.lock().unwrap();
        let points = history
            .get(ticker)
            .ok_or_else(|| MarketDataError::SymbolNotFound(ticker.to_string()))?;
        Ok(points
            .iter()
            .filter(|p| p.timestamp >= start && p.timestamp <= end)
            .cloned()
            .collect())
    }
}

// =========================================================================
// Failing HotCache
// =========================================================================

pub struct UnavailableHotCache;

#[async_trait]
impl HotCache for UnavailableHotCache {
    async fn get(&self, _ticker: &Ticker) -> Result<Option<PricePoint>> {
        Err(Error::CacheUnavailable("connection refused".into()))
    }

    async fn set(&self, _ticker: &Ticker, _point: PricePoint, _ttl: Duration) -> Result<()> {
        Err(Error::CacheUnavailable("connection refused".into()))
    }
}

// =========================================================================
// Mock WatchlistStore
// =========================================================================

#[derive(Clone, Default)]
pub struct MockWatchlistStore {
    entries: Arc<Mutex<HashMap<Ticker, WatchlistEntry>>>,
}

impl MockWatchlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, ticker: &str) -> Option<WatchlistEntry> {
        self.entries.lock().unwrap().get(ticker).cloned()
    }
}

#[async_trait]
impl WatchlistStore for MockWatchlistStore {
    async fn upsert_entry(
        &self,
        ticker: &Ticker,
        priority: WatchlistPriority,
    ) -> Result<WatchlistEntry> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .entry(ticker.clone())
            .or_insert_with(|| WatchlistEntry::new(ticker.clone(), priority));
        entry.priority = priority;
        Ok(entry.clone())
    }

    async fn remove_entry(&self, ticker: &Ticker) -> Result<bool> {
        Ok(self.entries.lock().unwrap().remove(ticker).is_some())
    }

    async fn list_entries(&self) -> Result<Vec<WatchlistEntry>> {
        Ok(self.entries.lock().unwrap().values().cloned().collect())
    }

    async fn mark_refreshed(&self, ticker: &Ticker, at: DateTime<Utc>) -> Result<()> {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(ticker) {
            entry.last_refreshed_at = Some(at);
        }
        Ok(())
    }
}
