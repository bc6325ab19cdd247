//! Papertrade Market Data Crate
//!
//! Price model and upstream access for the papertrade market data core.
//!
//! # Overview
//!
//! - [`PricePoint`] is the canonical price observation every tier exchanges
//! - [`UpstreamClient`] performs one provider request per ticker and
//!   classifies failures into [`MarketDataError`]
//! - [`RetryingClient`] repeats transient failures with exponential backoff
//! - [`AlphaVantageClient`] is the production client
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  RetryingClient  |  (bounded retry on Timeout)
//! +------------------+
//!          |
//!          v
//! +--------------------+     +---------------------+
//! | AlphaVantageClient | --> | PricePointValidator |
//! +--------------------+     +---------------------+
//!          |
//!          v
//! +------------------+
//! |    PricePoint    |  (source = upstream)
//! +------------------+
//! ```
//!
//! Rate limiting and caching live in `papertrade-core`; nothing in this crate
//! holds shared state.

pub mod errors;
pub mod models;
pub mod provider;

pub use errors::{MarketDataError, RetryClass};
pub use models::{Currency, Money, PricePoint, PriceSource, Ticker};
pub use provider::alpha_vantage::AlphaVantageClient;
pub use provider::{
    PricePointValidator, RetryPolicy, RetryingClient, UpstreamClient, ValidationSeverity,
    ValidatorConfig,
};
