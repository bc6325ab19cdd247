//! SQLite storage implementation for the papertrade market data core.
//!
//! This crate is the only place where Diesel appears. It implements the
//! store traits defined in `papertrade-core`:
//! - [`MarketDataRepository`] - the warm tier (`WarmStore`)
//! - [`WatchlistRepository`] - `WatchlistStore`
//! - [`SqliteRateLimitStore`] - the shared `RateLimitStore`
//!
//! ```text
//!   papertrade-core (traits)
//!            |
//!            v
//!   storage-sqlite (this crate)
//!            |
//!            v
//!        SQLite DB (WAL)
//! ```
//!
//! All writes of a process go through one writer ([`WriteHandle`]), each job
//! in an `IMMEDIATE` transaction. Rate-limit checks take their own pooled
//! connection so that several processes sharing the file also share one
//! budget.

pub mod db;
pub mod errors;
pub mod schema;

pub mod market_data;
pub mod rate_limit;
pub mod watchlist;

pub use db::{
    create_pool, get_connection, init, open, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};
pub use errors::{IntoCore, StorageError};
pub use market_data::MarketDataRepository;
pub use rate_limit::SqliteRateLimitStore;
pub use watchlist::WatchlistRepository;

pub use papertrade_core::errors::{DatabaseError, Error, Result};
