//! Watchlist module - tickers kept warm by background refresh.

mod watchlist_manager;
mod watchlist_model;
mod watchlist_scheduler;
mod watchlist_traits;

pub use watchlist_manager::WatchlistManager;
pub use watchlist_model::{WatchlistEntry, WatchlistPriority};
pub use watchlist_scheduler::{RefreshReport, WatchlistScheduler};
pub use watchlist_traits::WatchlistStore;
