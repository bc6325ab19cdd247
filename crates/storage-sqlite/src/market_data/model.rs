//! Database models for price history and latest prices.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use papertrade_market_data::{Money, PricePoint, PriceSource};
use rust_decimal::Decimal;

use crate::errors::StorageError;

/// Database model for `price_history` rows.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::price_history)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PriceHistoryDB {
    pub ticker: String,
    pub timestamp: NaiveDateTime,
    pub price: String,
    pub currency: String,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub close: Option<String>,
    pub volume: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Database model for `latest_prices` rows.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::latest_prices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LatestPriceDB {
    pub ticker: String,
    pub timestamp: NaiveDateTime,
    pub price: String,
    pub currency: String,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub close: Option<String>,
    pub volume: Option<String>,
    pub updated_at: NaiveDateTime,
}

fn decimal_text(value: Option<Decimal>) -> Option<String> {
    value.map(|d| d.to_string())
}

fn parse_decimal(field: &str, text: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| StorageError::InvalidData(format!("{field} '{text}': {e}")))
}

fn parse_optional(field: &str, text: Option<&str>) -> Result<Option<Decimal>, StorageError> {
    text.map(|t| parse_decimal(field, t)).transpose()
}

struct Columns<'a> {
    ticker: &'a str,
    timestamp: NaiveDateTime,
    price: &'a str,
    currency: &'a str,
    open: Option<&'a str>,
    high: Option<&'a str>,
    low: Option<&'a str>,
    close: Option<&'a str>,
    volume: Option<&'a str>,
}

impl Columns<'_> {
    /// Rebuild the point. Everything read back from SQLite is a warm read.
    fn into_point(self) -> Result<PricePoint, StorageError> {
        let timestamp = DateTime::<Utc>::from_naive_utc_and_offset(self.timestamp, Utc);
        let price = parse_decimal("price", self.price)?;
        Ok(PricePoint::new(
            self.ticker,
            Money::new(price, self.currency.to_string()),
            timestamp,
            PriceSource::Warm,
        )
        .with_ohlcv(
            parse_optional("open", self.open)?,
            parse_optional("high", self.high)?,
            parse_optional("low", self.low)?,
            parse_optional("close", self.close)?,
            parse_optional("volume", self.volume)?,
        ))
    }
}

impl PriceHistoryDB {
    pub fn from_point(point: &PricePoint, now: NaiveDateTime) -> Self {
        Self {
            ticker: point.ticker.to_string(),
            timestamp: point.timestamp.naive_utc(),
            price: point.price.amount.to_string(),
            currency: point.price.currency.to_string(),
            open: decimal_text(point.open),
            high: decimal_text(point.high),
            low: decimal_text(point.low),
            close: decimal_text(point.close),
            volume: decimal_text(point.volume),
            created_at: now,
        }
    }

    pub fn into_point(self) -> Result<PricePoint, StorageError> {
        Columns {
            ticker: &self.ticker,
            timestamp: self.timestamp,
            price: &self.price,
            currency: &self.currency,
            open: self.open.as_deref(),
            high: self.high.as_deref(),
            low: self.low.as_deref(),
            close: self.close.as_deref(),
            volume: self.volume.as_deref(),
        }
        .into_point()
    }
}

impl LatestPriceDB {
    pub fn from_point(point: &PricePoint, now: NaiveDateTime) -> Self {
        Self {
            ticker: point.ticker.to_string(),
            timestamp: point.timestamp.naive_utc(),
            price: point.price.amount.to_string(),
            currency: point.price.currency.to_string(),
            open: decimal_text(point.open),
            high: decimal_text(point.high),
            low: decimal_text(point.low),
            close: decimal_text(point.close),
            volume: decimal_text(point.volume),
            updated_at: now,
        }
    }

    pub fn into_point(self) -> Result<PricePoint, StorageError> {
        Columns {
            ticker: &self.ticker,
            timestamp: self.timestamp,
            price: &self.price,
            currency: &self.currency,
            open: self.open.as_deref(),
            high: self.high.as_deref(),
            low: self.low.as_deref(),
            close: self.close.as_deref(),
            volume: self.volume.as_deref(),
        }
        .into_point()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_row_preserves_enrichment_and_marks_warm() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 15, 30, 0).unwrap();
        let point = PricePoint::new(
            "AAPL",
            Money::new(dec!(150.25), "USD"),
            ts,
            PriceSource::Upstream,
        )
        .with_ohlcv(Some(dec!(149)), Some(dec!(151)), Some(dec!(148.5)), None, Some(dec!(1200)));

        let row = PriceHistoryDB::from_point(&point, ts.naive_utc());
        assert_eq!(row.price, "150.25");
        assert_eq!(row.close, None);

        let restored = row.into_point().unwrap();
        assert_eq!(restored, point);
        assert_eq!(restored.source, PriceSource::Warm);
        assert_eq!(restored.high, Some(dec!(151)));
        assert_eq!(restored.volume, Some(dec!(1200)));
    }

    #[test]
    fn test_corrupt_price_is_rejected() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 15, 30, 0).unwrap().naive_utc();
        let row = LatestPriceDB {
            ticker: "AAPL".into(),
            timestamp: ts,
            price: "not-a-number".into(),
            currency: "USD".into(),
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
            updated_at: ts,
        };
        assert!(matches!(row.into_point(), Err(StorageError::InvalidData(_))));
    }
}
