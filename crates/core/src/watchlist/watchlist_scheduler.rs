//! Background refresh of watched tickers.
//!
//! Spends whatever is left of the current rate-limit window on the most
//! important, stalest watchlist entries, using the same gateway read as
//! foreground requests.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::watchlist_manager::WatchlistManager;
use crate::config::SchedulerConfig;
use crate::market_data::MarketDataGateway;

/// Outcome of one scheduler tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub selected: usize,
    /// Reads that produced a fresh price.
    pub refreshed: usize,
    /// Reads that fell back to stale data or found none.
    pub failed: usize,
}

/// Periodically refreshes watchlist tickers through the gateway.
#[derive(Clone)]
pub struct WatchlistScheduler {
    gateway: MarketDataGateway,
    watchlist: WatchlistManager,
    config: SchedulerConfig,
}

impl WatchlistScheduler {
    pub fn new(
        gateway: MarketDataGateway,
        watchlist: WatchlistManager,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            gateway,
            watchlist,
            config,
        }
    }

    /// Spawn the refresh loop. It stops once `shutdown` reads `true`.
    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Watchlist scheduler started ({:?} interval)",
                self.config.interval
            );

            tokio::select! {
                _ = tokio::time::sleep(self.config.initial_delay) => {}
                _ = wait_for_shutdown(&mut shutdown) => {
                    info!("Watchlist scheduler stopped before first tick");
                    return;
                }
            }

            let mut ticker = interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_tick().await;
                    }
                    _ = wait_for_shutdown(&mut shutdown) => {
                        info!("Watchlist scheduler stopped");
                        return;
                    }
                }
            }
        })
    }

    /// Run one refresh pass.
    pub async fn run_tick(&self) -> RefreshReport {
        let budget = self.gateway.rate_limiter().remaining_budget().await;
        if budget == 0 {
            debug!("Watchlist refresh skipped: no rate-limit budget left in window");
            return RefreshReport::default();
        }

        let tickers = match self.watchlist.select_next_batch(budget as usize).await {
            Ok(tickers) => tickers,
            Err(e) => {
                warn!("Watchlist refresh skipped: failed to load watchlist: {}", e);
                return RefreshReport::default();
            }
        };
        if tickers.is_empty() {
            debug!("Watchlist refresh: nothing to refresh");
            return RefreshReport::default();
        }

        let mut report = RefreshReport {
            selected: tickers.len(),
            ..RefreshReport::default()
        };

        let outcomes: Vec<bool> = stream::iter(tickers)
            .map(|ticker| async move {
                let fresh = match self.gateway.get_current_price(&ticker).await {
                    Ok(point) => !point.is_stale,
                    Err(e) => {
                        debug!("Watchlist refresh of {} failed: {}", ticker, e);
                        false
                    }
                };
                if let Err(e) = self.watchlist.record_refresh(&ticker, Utc::now()).await {
                    warn!("Failed to record refresh of {}: {}", ticker, e);
                }
                fresh
            })
            .buffer_unordered(budget as usize)
            .collect()
            .await;

        for fresh in outcomes {
            if fresh {
                report.refreshed += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            "Watchlist refresh: {} selected, {} refreshed, {} failed",
            report.selected, report.refreshed, report.failed
        );
        report
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Sender dropped; nothing can stop us any more
            std::future::pending::<()>().await;
        }
    }
}
