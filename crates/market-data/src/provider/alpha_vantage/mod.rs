//! Alpha Vantage upstream client.
//!
//! - Current price via the GLOBAL_QUOTE endpoint
//! - Daily history via TIME_SERIES_DAILY (compact output)
//!
//! Note: the free tier allows 5 calls per minute and 500 per day. The client
//! itself never waits for budget; callers gate every request on a rate limiter.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::MarketDataError;
use crate::models::{Currency, Money, PricePoint, PriceSource, Ticker};
use crate::provider::{PricePointValidator, UpstreamClient};

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";

/// Alpha Vantage client for equities.
pub struct AlphaVantageClient {
    client: Client,
    base_url: String,
    api_key: String,
    currency: Currency,
    validator: PricePointValidator,
}

// ============================================================================
// Response structures for Alpha Vantage API
// ============================================================================

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<HashMap<String, String>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// TIME_SERIES_DAILY response
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyQuote>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyQuote {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

// ============================================================================
// AlphaVantageClient implementation
// ============================================================================

impl AlphaVantageClient {
    /// Create a client for `base_url` with the given API key.
    ///
    /// `timeout` bounds each HTTP request; `currency` is attached to every
    /// price since GLOBAL_QUOTE does not report one.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        currency: impl Into<Currency>,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            currency: currency.into(),
            validator: PricePointValidator::new(),
        }
    }

    pub fn with_validator(mut self, validator: PricePointValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Make a request to the Alpha Vantage API.
    async fn request(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = reqwest::Url::parse_with_params(&self.base_url, &all_params).map_err(|e| {
            MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to build URL: {}", e),
            }
        })?;

        debug!("Alpha Vantage request: {}", self.redact(url.as_str()));

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: self.redact(&e.to_string()),
                }
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: self.redact(&e.to_string()),
                }
            }
        })
    }

    fn redact(&self, text: &str) -> String {
        if self.api_key.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.api_key, "***")
        }
    }

    /// Check for API-level errors in the response.
    fn check_api_error(
        error_message: &Option<String>,
        note: &Option<String>,
        information: &Option<String>,
    ) -> Result<(), MarketDataError> {
        if let Some(ref msg) = error_message {
            // Alpha Vantage answers unknown symbols with "Invalid API call"
            return Err(MarketDataError::SymbolNotFound(msg.clone()));
        }

        for msg in [note, information].into_iter().flatten() {
            if Self::is_rate_limit_message(msg) {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            warn!("Alpha Vantage info: {}", msg);
        }

        Ok(())
    }

    fn is_rate_limit_message(msg: &str) -> bool {
        let lower = msg.to_lowercase();
        lower.contains("api call frequency")
            || lower.contains("rate limit")
            || lower.contains("requests per day")
    }

    fn malformed(message: impl Into<String>) -> MarketDataError {
        MarketDataError::Malformed {
            provider: PROVIDER_ID.to_string(),
            message: message.into(),
        }
    }

    /// Parse a date string in YYYY-MM-DD format to DateTime<Utc>.
    fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .and_then(|dt| Utc.from_local_datetime(&dt).single())
    }

    /// Parse a decimal value from a string.
    fn parse_decimal(s: &str) -> Option<Decimal> {
        Decimal::from_str(s.trim()).ok()
    }

    /// Normalise a GLOBAL_QUOTE body for a request sent at `requested_at`.
    ///
    /// The point carries the request time, not the arrival time, so a slow
    /// response never outranks one that was requested after it.
    fn parse_global_quote(
        &self,
        ticker: &Ticker,
        text: &str,
        requested_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<PricePoint, MarketDataError> {
        let response: GlobalQuoteResponse = serde_json::from_str(text)
            .map_err(|e| Self::malformed(format!("Failed to parse response: {}", e)))?;

        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        let quote = match response.global_quote {
            Some(q) if !q.is_empty() => q,
            _ => return Err(MarketDataError::SymbolNotFound(ticker.to_string())),
        };

        let field = |key: &str| quote.get(key).and_then(|v| Self::parse_decimal(v));

        let price = quote
            .get("05. price")
            .ok_or_else(|| Self::malformed(format!("{}: missing '05. price'", ticker)))
            .and_then(|raw| {
                Self::parse_decimal(raw)
                    .ok_or_else(|| Self::malformed(format!("{}: invalid price '{}'", ticker, raw)))
            })?;

        let point = PricePoint::new(
            ticker.clone(),
            Money::new(price, self.currency.clone()),
            requested_at,
            PriceSource::Upstream,
        )
        .with_ohlcv(
            field("02. open"),
            field("03. high"),
            field("04. low"),
            Some(price),
            field("06. volume"),
        );

        self.validator.validate(PROVIDER_ID, point, now)
    }

    /// Normalise a TIME_SERIES_DAILY body into ascending daily closes in `[start, end]`.
    fn parse_daily_series(
        &self,
        ticker: &Ticker,
        text: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        let response: TimeSeriesResponse = serde_json::from_str(text)
            .map_err(|e| Self::malformed(format!("Failed to parse response: {}", e)))?;

        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        let time_series = response.time_series.ok_or_else(|| {
            MarketDataError::SymbolNotFound(format!("No data for symbol: {}", ticker))
        })?;

        let mut points = Vec::with_capacity(time_series.len());
        for (date_str, daily) in time_series {
            let Some(timestamp) = Self::parse_date(&date_str) else {
                warn!("Alpha Vantage: skipping unparseable date '{}' for {}", date_str, ticker);
                continue;
            };
            if timestamp < start || timestamp > end {
                continue;
            }
            let Some(close) = Self::parse_decimal(&daily.close) else {
                warn!("Alpha Vantage: skipping {} for {}: bad close", date_str, ticker);
                continue;
            };

            let point = PricePoint::new(
                ticker.clone(),
                Money::new(close, self.currency.clone()),
                timestamp,
                PriceSource::Upstream,
            )
            .with_ohlcv(
                Self::parse_decimal(&daily.open),
                Self::parse_decimal(&daily.high),
                Self::parse_decimal(&daily.low),
                Some(close),
                Self::parse_decimal(&daily.volume),
            );

            match self.validator.validate(PROVIDER_ID, point, now) {
                Ok(valid) => points.push(valid),
                Err(e) => warn!("Alpha Vantage: dropping history row: {}", e),
            }
        }

        // Sort by timestamp ascending
        points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(points)
    }
}

// ============================================================================
// UpstreamClient trait implementation
// ============================================================================

#[async_trait]
impl UpstreamClient for AlphaVantageClient {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch(&self, ticker: &Ticker) -> Result<PricePoint, MarketDataError> {
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", ticker.as_str())];
        let requested_at = Utc::now();
        let text = self.request(&params).await?;
        let point = self.parse_global_quote(ticker, &text, requested_at, Utc::now())?;

        debug!(
            "Alpha Vantage: {} = {} at {}",
            ticker, point.price, point.timestamp
        );
        Ok(point)
    }

    async fn fetch_history(
        &self,
        ticker: &Ticker,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        if start > end {
            return Ok(Vec::new());
        }

        let params = [
            ("function", "TIME_SERIES_DAILY"),
            ("symbol", ticker.as_str()),
            ("outputsize", "compact"), // 'full' is premium-only
        ];

        let text = self.request(&params).await?;
        let points = self.parse_daily_series(ticker, &text, start, end, Utc::now())?;

        debug!(
            "Alpha Vantage: fetched {} daily points for {}",
            points.len(),
            ticker
        );
        Ok(points)
    }
}
