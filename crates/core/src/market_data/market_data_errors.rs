use papertrade_market_data::{MarketDataError, Ticker};
use thiserror::Error;

/// Reasons a tier could not produce a fresh price.
///
/// Everything except [`NoDataAvailable`](Self::NoDataAvailable) is absorbed
/// by the gateway and only drives its fallback path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Rate limit exceeded for {ticker}")]
    RateLimitExceeded { ticker: Ticker },

    #[error("Upstream unavailable for {ticker}: {message}")]
    UpstreamUnavailable { ticker: Ticker, message: String },

    #[error("Malformed upstream data for {ticker}: {message}")]
    UpstreamMalformed { ticker: Ticker, message: String },

    #[error("Symbol not known upstream: {ticker}")]
    UnknownSymbol { ticker: Ticker },

    #[error("{tier} store unavailable: {message}")]
    CacheStoreUnavailable { tier: &'static str, message: String },

    #[error("No data available for {ticker}")]
    NoDataAvailable { ticker: Ticker },
}

impl GatewayError {
    /// Classify an upstream failure.
    pub fn from_upstream(ticker: &Ticker, error: &MarketDataError) -> Self {
        match error {
            MarketDataError::RateLimited { .. } => GatewayError::RateLimitExceeded {
                ticker: ticker.clone(),
            },
            MarketDataError::SymbolNotFound(_) => GatewayError::UnknownSymbol {
                ticker: ticker.clone(),
            },
            MarketDataError::Malformed { message, .. } => GatewayError::UpstreamMalformed {
                ticker: ticker.clone(),
                message: message.clone(),
            },
            MarketDataError::Timeout { .. }
            | MarketDataError::ProviderError { .. }
            | MarketDataError::NotSupported { .. } => GatewayError::UpstreamUnavailable {
                ticker: ticker.clone(),
                message: error.to_string(),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GatewayError::NoDataAvailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_upstream() {
        let ticker = Ticker::new("AAPL");
        let provider = "ALPHA_VANTAGE".to_string();

        assert!(matches!(
            GatewayError::from_upstream(&ticker, &MarketDataError::RateLimited { provider: provider.clone() }),
            GatewayError::RateLimitExceeded { .. }
        ));
        assert!(matches!(
            GatewayError::from_upstream(&ticker, &MarketDataError::Timeout { provider: provider.clone() }),
            GatewayError::UpstreamUnavailable { .. }
        ));
        assert!(matches!(
            GatewayError::from_upstream(
                &ticker,
                &MarketDataError::Malformed { provider, message: "bad".into() }
            ),
            GatewayError::UpstreamMalformed { .. }
        ));
        assert!(matches!(
            GatewayError::from_upstream(&ticker, &MarketDataError::SymbolNotFound("AAPL".into())),
            GatewayError::UnknownSymbol { .. }
        ));
    }

    #[test]
    fn test_only_no_data_is_terminal() {
        let ticker = Ticker::new("MSFT");
        assert!(GatewayError::NoDataAvailable { ticker: ticker.clone() }.is_terminal());
        assert!(!GatewayError::RateLimitExceeded { ticker }.is_terminal());
    }
}
