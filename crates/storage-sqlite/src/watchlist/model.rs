//! Database model for watchlist entries.

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use papertrade_core::watchlist::{WatchlistEntry, WatchlistPriority};

use crate::errors::StorageError;

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::ticker_watchlist)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WatchlistEntryDB {
    pub ticker: String,
    pub last_refreshed_at: Option<NaiveDateTime>,
    pub priority: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<WatchlistEntryDB> for WatchlistEntry {
    type Error = StorageError;

    fn try_from(row: WatchlistEntryDB) -> Result<Self, Self::Error> {
        let priority = WatchlistPriority::from_rank(row.priority).ok_or_else(|| {
            StorageError::InvalidData(format!(
                "watchlist priority {} for {}",
                row.priority, row.ticker
            ))
        })?;
        Ok(WatchlistEntry {
            ticker: row.ticker.into(),
            last_refreshed_at: row
                .last_refreshed_at
                .map(|t| DateTime::<Utc>::from_naive_utc_and_offset(t, Utc)),
            priority,
        })
    }
}
