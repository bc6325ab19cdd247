use std::fmt;

use chrono::{DateTime, Utc};
use papertrade_market_data::Ticker;
use serde::{Deserialize, Serialize};

/// Refresh priority tier. Declaration order is refresh order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchlistPriority {
    /// Held in at least one portfolio.
    ActivePortfolio,
    /// Explicitly watched by a user.
    Watched,
    Cold,
}

impl WatchlistPriority {
    /// Integer rank used for persistence. Lower refreshes first.
    pub fn rank(self) -> i32 {
        match self {
            WatchlistPriority::ActivePortfolio => 0,
            WatchlistPriority::Watched => 1,
            WatchlistPriority::Cold => 2,
        }
    }

    pub fn from_rank(rank: i32) -> Option<Self> {
        match rank {
            0 => Some(WatchlistPriority::ActivePortfolio),
            1 => Some(WatchlistPriority::Watched),
            2 => Some(WatchlistPriority::Cold),
            _ => None,
        }
    }
}

impl fmt::Display for WatchlistPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WatchlistPriority::ActivePortfolio => "active_portfolio",
            WatchlistPriority::Watched => "watched",
            WatchlistPriority::Cold => "cold",
        };
        f.write_str(label)
    }
}

/// A ticker the background scheduler keeps warm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub ticker: Ticker,
    /// `None` until the first refresh attempt.
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub priority: WatchlistPriority,
}

impl WatchlistEntry {
    pub fn new(ticker: impl Into<Ticker>, priority: WatchlistPriority) -> Self {
        Self {
            ticker: ticker.into(),
            last_refreshed_at: None,
            priority,
        }
    }

    /// Sort key for refresh order: tier, then never-refreshed, then oldest
    /// refresh, then ticker.
    pub fn refresh_order_key(&self) -> (WatchlistPriority, Option<DateTime<Utc>>, &str) {
        (self.priority, self.last_refreshed_at, self.ticker.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_rank_round_trip() {
        for priority in [
            WatchlistPriority::ActivePortfolio,
            WatchlistPriority::Watched,
            WatchlistPriority::Cold,
        ] {
            assert_eq!(WatchlistPriority::from_rank(priority.rank()), Some(priority));
        }
        assert_eq!(WatchlistPriority::from_rank(7), None);
    }

    #[test]
    fn test_priority_order() {
        assert!(WatchlistPriority::ActivePortfolio < WatchlistPriority::Watched);
        assert!(WatchlistPriority::Watched < WatchlistPriority::Cold);
    }
}
