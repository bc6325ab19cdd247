use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Length of the short rate-limit window.
pub const RATE_LIMIT_WINDOW_SECS: i64 = 60;

/// The two budgets a call is counted against, evaluated at one instant.
///
/// A call recorded at `t` belongs to the window while `t > window_start`,
/// and to the UTC calendar `day` of `t`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallWindow {
    pub now: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub day: NaiveDate,
}

impl CallWindow {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            window_start: now - Duration::seconds(RATE_LIMIT_WINDOW_SECS),
            day: now.date_naive(),
        }
    }
}

/// Calls already spent in the current window and day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitUsage {
    pub window_used: u32,
    pub day_used: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_call_window_at() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 30).unwrap();
        let window = CallWindow::at(now);
        assert_eq!(
            window.window_start,
            Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 30).unwrap()
        );
        assert_eq!(window.day, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }
}
