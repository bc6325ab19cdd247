use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{Currency, Ticker};

/// Which tier produced a [`PricePoint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Hot,
    Warm,
    Upstream,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Hot => "hot",
            PriceSource::Warm => "warm",
            PriceSource::Upstream => "upstream",
        }
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monetary amount with its currency.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<Currency>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// A single price observation for a ticker.
///
/// Identity is `(ticker, price, timestamp)`. The OHLCV fields are enrichment
/// and, together with `source` and `is_stale`, take no part in equality or
/// hashing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub ticker: Ticker,
    pub price: Money,
    pub timestamp: DateTime<Utc>,
    pub source: PriceSource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,

    /// Set when the point was evaluated against a max age, or forced when a
    /// fallback value is served.
    #[serde(default)]
    pub is_stale: bool,
}

impl PricePoint {
    /// Create a point with only the required fields.
    pub fn new(
        ticker: impl Into<Ticker>,
        price: Money,
        timestamp: DateTime<Utc>,
        source: PriceSource,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            price,
            timestamp,
            source,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
            is_stale: false,
        }
    }

    /// Attach OHLCV enrichment.
    pub fn with_ohlcv(
        mut self,
        open: Option<Decimal>,
        high: Option<Decimal>,
        low: Option<Decimal>,
        close: Option<Decimal>,
        volume: Option<Decimal>,
    ) -> Self {
        self.open = open;
        self.high = high;
        self.low = low;
        self.close = close;
        self.volume = volume;
        self
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.timestamp)
    }

    /// Staleness with an inclusive boundary: a point exactly `max_age` old is stale.
    pub fn is_stale_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age_at(now) >= max_age
    }

    /// Re-evaluate `is_stale` against `max_age`.
    pub fn evaluated_at(mut self, now: DateTime<Utc>, max_age: Duration) -> Self {
        self.is_stale = self.is_stale_at(now, max_age);
        self
    }

    pub fn with_source(mut self, source: PriceSource) -> Self {
        self.source = source;
        self
    }

    /// Tag the point as stale regardless of its age.
    pub fn into_stale(mut self) -> Self {
        self.is_stale = true;
        self
    }

    pub fn into_fresh(mut self) -> Self {
        self.is_stale = false;
        self
    }
}

impl PartialEq for PricePoint {
    fn eq(&self, other: &Self) -> bool {
        self.ticker == other.ticker && self.price == other.price && self.timestamp == other.timestamp
    }
}

impl Eq for PricePoint {}

impl Hash for PricePoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ticker.hash(state);
        self.price.hash(state);
        self.timestamp.hash(state);
    }
}
