//! Background tasks for the long-running `serve` mode.

use std::sync::Arc;
use std::time::Duration;

use papertrade_core::{SchedulerConfig, WatchlistScheduler};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use crate::main_lib::AppState;

/// How often expired hot cache entries are swept.
const HOT_CACHE_PURGE_SECS: u64 = 60;

/// Start the watchlist refresh loop and the hot cache sweeper.
///
/// Both stop once `shutdown` flips to `true`.
pub fn start_background_tasks(
    state: Arc<AppState>,
    config: SchedulerConfig,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let scheduler = WatchlistScheduler::new(state.gateway.clone(), state.watchlist.clone(), config);
    vec![
        scheduler.start(shutdown.clone()),
        start_hot_cache_sweeper(state, shutdown),
    ]
}

fn start_hot_cache_sweeper(
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sweep = interval(Duration::from_secs(HOT_CACHE_PURGE_SECS));
        loop {
            tokio::select! {
                _ = sweep.tick() => {
                    let purged = state.hot_cache.purge_expired();
                    if purged > 0 {
                        debug!("Purged {} expired hot cache entries", purged);
                    }
                }
                _ = wait_for_shutdown(&mut shutdown) => {
                    info!("Hot cache sweeper stopped");
                    return;
                }
            }
        }
    })
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
