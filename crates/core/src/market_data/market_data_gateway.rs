//! Market data gateway.
//!
//! Every price lookup in the system goes through [`MarketDataGateway`]. A
//! single-ticker read walks an explicit state machine:
//!
//! ```text
//! TRY_HOT --miss/stale--> TRY_WARM --miss/old--> TRY_UPSTREAM --denied/failed--> FALLBACK
//!    |                       |                        |                             |
//!    +--fresh--> RETURN <----+---------fresh----------+        RETURN stale <-------+
//!                                                              FAIL (no warm row) <-+
//! ```
//!
//! Only `NoDataAvailable` ever reaches the caller as an error. Every other
//! tier failure is logged and turned into a fallback.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use papertrade_market_data::{MarketDataError, PricePoint, PriceSource, Ticker, UpstreamClient};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::market_data_constants::BATCH_READ_CONCURRENCY;
use super::market_data_errors::GatewayError;
use super::market_data_traits::WarmStore;
use crate::config::MarketDataConfig;
use crate::hot_cache::HotCache;
use crate::rate_limit::RateLimiter;

type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Position in the single-ticker read.
#[derive(Debug)]
enum ReadState {
    TryHot,
    TryWarm,
    TryUpstream,
    Fallback(GatewayError),
    Return(PricePoint),
    Fail(GatewayError),
}

/// Orchestrates hot cache, warm store and upstream into one read path.
///
/// Cloning is cheap; all tiers are shared.
#[derive(Clone)]
pub struct MarketDataGateway {
    hot: Arc<dyn HotCache>,
    warm: Arc<dyn WarmStore>,
    upstream: Arc<dyn UpstreamClient>,
    limiter: RateLimiter,
    upstream_permits: Arc<Semaphore>,
    max_age: Duration,
    warm_window: Duration,
    hot_ttl: StdDuration,
}

impl MarketDataGateway {
    pub fn new(
        config: &MarketDataConfig,
        hot: Arc<dyn HotCache>,
        warm: Arc<dyn WarmStore>,
        upstream: Arc<dyn UpstreamClient>,
        limiter: RateLimiter,
    ) -> Self {
        let permits = limiter.limits().calls_per_minute.max(1) as usize;
        Self {
            hot,
            warm,
            upstream,
            limiter,
            upstream_permits: Arc::new(Semaphore::new(permits)),
            max_age: to_chrono(config.max_age),
            warm_window: to_chrono(config.warm_acceptance_window()),
            hot_ttl: config.hot_cache_ttl,
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Current price for `ticker`, fresh or explicitly tagged stale.
    ///
    /// Fails only with [`GatewayError::NoDataAvailable`].
    pub async fn get_current_price(&self, ticker: &Ticker) -> GatewayResult<PricePoint> {
        let mut state = ReadState::TryHot;
        loop {
            state = match state {
                ReadState::TryHot => self.try_hot(ticker).await,
                ReadState::TryWarm => self.try_warm(ticker).await,
                ReadState::TryUpstream => self.try_upstream(ticker).await,
                ReadState::Fallback(reason) => match self.fallback(ticker, reason).await {
                    Ok(point) => ReadState::Return(point),
                    Err(e) => ReadState::Fail(e),
                },
                ReadState::Return(point) => return Ok(point),
                ReadState::Fail(e) => return Err(e),
            };
        }
    }

    /// Like [`get_current_price`](Self::get_current_price) with a deadline.
    ///
    /// On expiry the fallback value is served. An upstream fetch that already
    /// spent its rate-limit token keeps running and persists in the background.
    pub async fn get_current_price_within(
        &self,
        ticker: &Ticker,
        timeout: StdDuration,
    ) -> GatewayResult<PricePoint> {
        match tokio::time::timeout(timeout, self.get_current_price(ticker)).await {
            Ok(result) => result,
            Err(_) => {
                let reason = GatewayError::UpstreamUnavailable {
                    ticker: ticker.clone(),
                    message: format!("deadline of {:?} exceeded", timeout),
                };
                self.fallback(ticker, reason).await
            }
        }
    }

    /// Resolve every ticker independently. Tickers that cannot be resolved
    /// are left out of the result.
    pub async fn get_batch_prices(&self, tickers: &[Ticker]) -> HashMap<Ticker, PricePoint> {
        let unique: HashSet<Ticker> = tickers.iter().filter(|t| !t.is_empty()).cloned().collect();
        let requested = unique.len();

        let results: Vec<(Ticker, GatewayResult<PricePoint>)> = stream::iter(unique)
            .map(|ticker| async move {
                let result = self.get_current_price(&ticker).await;
                (ticker, result)
            })
            .buffer_unordered(BATCH_READ_CONCURRENCY)
            .collect()
            .await;

        let mut prices = HashMap::with_capacity(results.len());
        for (ticker, result) in results {
            match result {
                Ok(point) => {
                    prices.insert(ticker, point);
                }
                Err(e) => warn!("Batch read: {}", e),
            }
        }

        debug!("Batch read resolved {}/{} tickers", prices.len(), requested);
        prices
    }

    /// Daily history for `ticker` in `[start, end]`, ascending.
    ///
    /// Backfills from upstream when the warm store has nothing for the range.
    pub async fn get_price_history(
        &self,
        ticker: &Ticker,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> GatewayResult<Vec<PricePoint>> {
        if start > end {
            return Ok(Vec::new());
        }

        let warm_points = match self.warm.get_range(ticker, start, end).await {
            Ok(points) if !points.is_empty() => {
                debug!("{}: {} history points from warm store", ticker, points.len());
                return Ok(points);
            }
            Ok(points) => Some(points),
            Err(e) => {
                warn!(
                    "{}: {}, trying upstream for history",
                    ticker,
                    GatewayError::CacheStoreUnavailable {
                        tier: "warm",
                        message: e.to_string(),
                    }
                );
                None
            }
        };

        match self.backfill_history(ticker, start, end).await {
            Ok(points) => Ok(points),
            Err(reason) => {
                debug!("{}: history backfill skipped ({})", ticker, reason);
                warm_points.ok_or_else(|| GatewayError::NoDataAvailable {
                    ticker: ticker.clone(),
                })
            }
        }
    }

    async fn try_hot(&self, ticker: &Ticker) -> ReadState {
        match self.hot.get(ticker).await {
            Ok(Some(point)) if !point.is_stale_at(Utc::now(), self.max_age) => {
                debug!("{}: TRY_HOT -> RETURN (hit)", ticker);
                ReadState::Return(point.into_fresh())
            }
            Ok(Some(point)) => {
                debug!(
                    "{}: TRY_HOT -> TRY_WARM (hot entry from {} is stale)",
                    ticker, point.timestamp
                );
                ReadState::TryWarm
            }
            Ok(None) => {
                debug!("{}: TRY_HOT -> TRY_WARM (miss)", ticker);
                ReadState::TryWarm
            }
            Err(e) => {
                let reason = GatewayError::CacheStoreUnavailable {
                    tier: "hot",
                    message: e.to_string(),
                };
                warn!("{}: TRY_HOT -> TRY_WARM ({})", ticker, reason);
                ReadState::TryWarm
            }
        }
    }

    async fn try_warm(&self, ticker: &Ticker) -> ReadState {
        match self.warm.get_latest(ticker).await {
            Ok(Some(point)) => {
                let age = point.age_at(Utc::now());
                if age < self.warm_window {
                    debug!("{}: TRY_WARM -> RETURN (row from {})", ticker, point.timestamp);
                    let point = point.with_source(PriceSource::Warm).into_fresh();
                    self.populate_hot(ticker, &point).await;
                    ReadState::Return(point)
                } else {
                    debug!(
                        "{}: TRY_WARM -> TRY_UPSTREAM (row from {} is {}s old)",
                        ticker,
                        point.timestamp,
                        age.num_seconds()
                    );
                    ReadState::TryUpstream
                }
            }
            Ok(None) => {
                debug!("{}: TRY_WARM -> TRY_UPSTREAM (miss)", ticker);
                ReadState::TryUpstream
            }
            Err(e) => {
                let reason = GatewayError::CacheStoreUnavailable {
                    tier: "warm",
                    message: e.to_string(),
                };
                warn!("{}: TRY_WARM -> TRY_UPSTREAM ({})", ticker, reason);
                ReadState::TryUpstream
            }
        }
    }

    async fn try_upstream(&self, ticker: &Ticker) -> ReadState {
        let permit = match self.acquire_upstream_slot(ticker).await {
            Ok(permit) => permit,
            Err(reason) => {
                debug!("{}: TRY_UPSTREAM -> FALLBACK ({})", ticker, reason);
                return ReadState::Fallback(reason);
            }
        };

        // Spawned so that a caller timeout does not cancel a paid-for fetch.
        let gateway = self.clone();
        let owned = ticker.clone();
        let task = tokio::spawn(async move {
            let _permit = permit;
            gateway.fetch_and_persist(&owned).await
        });

        match task.await {
            Ok(Ok(point)) => {
                debug!("{}: TRY_UPSTREAM -> RETURN ({})", ticker, point.price);
                ReadState::Return(point)
            }
            Ok(Err(e)) => {
                let reason = GatewayError::from_upstream(ticker, &e);
                warn!("{}: TRY_UPSTREAM -> FALLBACK ({})", ticker, reason);
                ReadState::Fallback(reason)
            }
            Err(e) => {
                let reason = GatewayError::UpstreamUnavailable {
                    ticker: ticker.clone(),
                    message: e.to_string(),
                };
                error!("{}: upstream task failed: {}", ticker, reason);
                ReadState::Fallback(reason)
            }
        }
    }

    async fn fallback(&self, ticker: &Ticker, reason: GatewayError) -> GatewayResult<PricePoint> {
        match self.warm.get_latest(ticker).await {
            Ok(Some(point)) => {
                info!(
                    "{}: serving stale price from {} ({})",
                    ticker, point.timestamp, reason
                );
                Ok(point.with_source(PriceSource::Warm).into_stale())
            }
            Ok(None) => {
                debug!("{}: FALLBACK -> FAIL (no warm row; {})", ticker, reason);
                Err(GatewayError::NoDataAvailable {
                    ticker: ticker.clone(),
                })
            }
            Err(e) => {
                warn!(
                    "{}: FALLBACK -> FAIL (warm store unavailable: {}; {})",
                    ticker, e, reason
                );
                Err(GatewayError::NoDataAvailable {
                    ticker: ticker.clone(),
                })
            }
        }
    }

    /// Take an in-process upstream slot, then spend one rate-limit token.
    async fn acquire_upstream_slot(&self, ticker: &Ticker) -> GatewayResult<OwnedSemaphorePermit> {
        let permit = self
            .upstream_permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| GatewayError::UpstreamUnavailable {
                ticker: ticker.clone(),
                message: e.to_string(),
            })?;

        if !self.limiter.try_acquire().await {
            return Err(GatewayError::RateLimitExceeded {
                ticker: ticker.clone(),
            });
        }
        Ok(permit)
    }

    async fn fetch_and_persist(&self, ticker: &Ticker) -> Result<PricePoint, MarketDataError> {
        let point = self
            .upstream
            .fetch(ticker)
            .await?
            .with_source(PriceSource::Upstream)
            .into_fresh();

        if let Err(e) = self.warm.upsert_batch(std::slice::from_ref(&point)).await {
            error!("{}: failed to persist upstream price: {}", ticker, e);
        }
        self.populate_hot(ticker, &point).await;
        Ok(point)
    }

    async fn backfill_history(
        &self,
        ticker: &Ticker,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> GatewayResult<Vec<PricePoint>> {
        let permit = self.acquire_upstream_slot(ticker).await?;

        let gateway = self.clone();
        let owned = ticker.clone();
        let task = tokio::spawn(async move {
            let _permit = permit;
            let points = gateway.upstream.fetch_history(&owned, start, end).await?;
            if !points.is_empty() {
                match gateway.warm.upsert_batch(&points).await {
                    Ok(written) => info!("{}: backfilled {} history points", owned, written),
                    Err(e) => error!("{}: failed to persist history: {}", owned, e),
                }
            }
            Ok::<_, MarketDataError>(points)
        });

        match task.await {
            Ok(Ok(points)) => Ok(points),
            Ok(Err(e)) => Err(GatewayError::from_upstream(ticker, &e)),
            Err(e) => Err(GatewayError::UpstreamUnavailable {
                ticker: ticker.clone(),
                message: e.to_string(),
            }),
        }
    }

    async fn populate_hot(&self, ticker: &Ticker, point: &PricePoint) {
        if let Err(e) = self.hot.set(ticker, point.clone(), self.hot_ttl).await {
            warn!("{}: failed to populate hot cache: {}", ticker, e);
        }
    }
}

fn to_chrono(duration: StdDuration) -> Duration {
    Duration::from_std(duration).unwrap_or_else(|_| Duration::days(365 * 100))
}
