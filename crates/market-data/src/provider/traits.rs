//! Upstream client trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::MarketDataError;
use crate::models::{PricePoint, Ticker};

/// Client for the rate-limited external price provider.
///
/// One call to [`fetch`](Self::fetch) is one provider request. Implementations
/// normalise the provider payload into a [`PricePoint`] with
/// [`PriceSource::Upstream`](crate::models::PriceSource::Upstream) and classify
/// failures into [`MarketDataError`] variants. Rate limiting is the caller's
/// job; a client never waits for budget.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use papertrade_market_data::{MarketDataError, PricePoint, Ticker, UpstreamClient};
///
/// struct FixedPriceClient;
///
/// #[async_trait]
/// impl UpstreamClient for FixedPriceClient {
///     fn id(&self) -> &'static str {
///         "FIXED"
///     }
///
///     async fn fetch(&self, ticker: &Ticker) -> Result<PricePoint, MarketDataError> {
///         // ...
///     }
/// }
/// ```
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Constant identifier such as "ALPHA_VANTAGE", used in logs and errors.
    fn id(&self) -> &'static str;

    /// Fetch the current price for a ticker.
    async fn fetch(&self, ticker: &Ticker) -> Result<PricePoint, MarketDataError>;

    /// Fetch daily history for a ticker, ordered by timestamp ascending.
    ///
    /// `start` and `end` are inclusive. Default implementation returns
    /// `NotSupported`.
    async fn fetch_history(
        &self,
        ticker: &Ticker,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        let _ = (ticker, start, end);
        Err(MarketDataError::NotSupported {
            operation: "history".to_string(),
            provider: self.id().to_string(),
        })
    }
}
