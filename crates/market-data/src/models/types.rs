use std::borrow::{Borrow, Cow};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Currency code (ISO 4217) - mostly static
pub type Currency = Cow<'static, str>;

/// Ticker symbol as used throughout the price lookup path.
///
/// Symbols are trimmed and upper-cased on construction so that `" aapl"` and
/// `"AAPL"` address the same cache and store rows.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(symbol.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Ticker {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Ticker {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Ticker {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&String> for Ticker {
    fn from(value: &String) -> Self {
        Self::new(value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_normalizes_case_and_whitespace() {
        assert_eq!(Ticker::new(" aapl "), Ticker::new("AAPL"));
        assert_eq!(Ticker::new("brk.b").as_str(), "BRK.B");
    }

    #[test]
    fn test_ticker_serializes_transparently() {
        let json = serde_json::to_string(&Ticker::new("msft")).unwrap();
        assert_eq!(json, "\"MSFT\"");
    }

    #[test]
    fn test_ticker_deserializes_normalized() {
        let ticker: Ticker = serde_json::from_str("\" aapl \"").unwrap();
        assert_eq!(ticker, Ticker::new("AAPL"));
        assert_eq!(ticker.as_str(), "AAPL");
    }
}
