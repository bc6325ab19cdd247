//! Upstream client abstraction and implementations.
//!
//! This module contains:
//! - The `UpstreamClient` trait every provider client implements
//! - `RetryingClient`, a decorator that retries transient failures
//! - `PricePointValidator`, which rejects implausible provider payloads
//! - The Alpha Vantage client

mod retry;
mod traits;
mod validator;

pub mod alpha_vantage;

pub use retry::{RetryPolicy, RetryingClient};
pub use traits::UpstreamClient;
pub use validator::{PricePointValidator, ValidationSeverity, ValidatorConfig};
