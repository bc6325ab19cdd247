//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The error enum for all upstream operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while talking to the upstream provider.
///
/// Each variant is classified into a [`RetryClass`] via
/// [`retry_class`](Self::retry_class).
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol is unknown to the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider rejected the call because its quota is exhausted.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The response could not be parsed or failed validation.
    #[error("Malformed response from {provider}: {message}")]
    Malformed {
        /// The provider that returned the payload
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// Transport failure or unexpected HTTP status.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The operation is not implemented by this provider.
    #[error("{provider} does not support '{operation}'")]
    NotSupported {
        operation: String,
        provider: String,
    },
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// Only timeouts are worth repeating:
    ///
    /// ```
    /// use papertrade_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::Timeout { provider: "ALPHA_VANTAGE".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = MarketDataError::RateLimited { provider: "ALPHA_VANTAGE".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Timeout { .. } => RetryClass::WithBackoff,

            Self::SymbolNotFound(_)
            | Self::RateLimited { .. }
            | Self::Malformed { .. }
            | Self::ProviderError { .. }
            | Self::NotSupported { .. } => RetryClass::Never,
        }
    }

    /// Returns true for failures caused by transport rather than content.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ProviderError { .. })
    }
}
