//! Rate-limit counters shared by every process using the same database.
//!
//! Each check-and-record runs on its own pooled connection inside an
//! `IMMEDIATE` transaction. SQLite hands out one write lock at a time, so
//! concurrent workers and processes serialise on it and the ceilings hold
//! across all of them.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::debug;

use crate::db::{with_connection, DbPool};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{rate_limit_calls, rate_limit_daily};
use papertrade_core::config::RateLimitConfig;
use papertrade_core::rate_limit::{CallWindow, RateLimitStore, RateLimitUsage};
use papertrade_core::Result;

pub struct SqliteRateLimitStore {
    pool: Arc<DbPool>,
}

impl SqliteRateLimitStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

fn to_count(n: i64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn prune(conn: &mut SqliteConnection, window: &CallWindow) -> QueryResult<()> {
    diesel::delete(
        rate_limit_calls::table
            .filter(rate_limit_calls::called_at.le(window.window_start.naive_utc())),
    )
    .execute(conn)?;
    diesel::delete(rate_limit_daily::table.filter(rate_limit_daily::day.lt(window.day)))
        .execute(conn)?;
    Ok(())
}

fn read_usage(conn: &mut SqliteConnection, window: &CallWindow) -> QueryResult<RateLimitUsage> {
    let window_used: i64 = rate_limit_calls::table
        .filter(rate_limit_calls::called_at.gt(window.window_start.naive_utc()))
        .filter(rate_limit_calls::called_at.le(window.now.naive_utc()))
        .count()
        .get_result(conn)?;
    let day_used: Option<i32> = rate_limit_daily::table
        .find(window.day)
        .select(rate_limit_daily::call_count)
        .first(conn)
        .optional()?;

    Ok(RateLimitUsage {
        window_used: to_count(window_used),
        day_used: to_count(i64::from(day_used.unwrap_or(0))),
    })
}

fn record(conn: &mut SqliteConnection, window: &CallWindow) -> QueryResult<()> {
    diesel::insert_into(rate_limit_calls::table)
        .values(rate_limit_calls::called_at.eq(window.now.naive_utc()))
        .execute(conn)?;
    diesel::insert_into(rate_limit_daily::table)
        .values((
            rate_limit_daily::day.eq(window.day),
            rate_limit_daily::call_count.eq(1),
        ))
        .on_conflict(rate_limit_daily::day)
        .do_update()
        .set(rate_limit_daily::call_count.eq(rate_limit_daily::call_count + 1))
        .execute(conn)?;
    Ok(())
}

#[async_trait]
impl RateLimitStore for SqliteRateLimitStore {
    async fn try_record_call(
        &self,
        window: CallWindow,
        limits: &RateLimitConfig,
    ) -> Result<bool> {
        let limits = *limits;
        with_connection(&self.pool, move |conn| {
            conn.immediate_transaction::<_, StorageError, _>(|c| {
                prune(c, &window)?;
                let usage = read_usage(c, &window)?;
                if usage.window_used >= limits.calls_per_minute
                    || usage.day_used >= limits.calls_per_day
                {
                    debug!(
                        "Shared rate limit reached: {} in window, {} today",
                        usage.window_used, usage.day_used
                    );
                    return Ok(false);
                }
                record(c, &window)?;
                Ok(true)
            })
            .into_core()
        })
        .await
    }

    async fn usage(&self, window: CallWindow) -> Result<RateLimitUsage> {
        with_connection(&self.pool, move |conn| read_usage(conn, &window).into_core()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open;
    use chrono::{Duration, TimeZone, Utc};
    use papertrade_core::rate_limit::RateLimiter;
    use tempfile::TempDir;

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap()
    }

    fn setup(calls_per_minute: u32, calls_per_day: u32) -> (TempDir, Arc<DbPool>, RateLimiter) {
        let dir = tempfile::tempdir().unwrap();
        let pool = open(dir.path().join("limits.db").to_str().unwrap()).unwrap();
        let limiter = RateLimiter::new(
            Arc::new(SqliteRateLimitStore::new(Arc::clone(&pool))),
            RateLimitConfig {
                calls_per_minute,
                calls_per_day,
            },
        );
        (dir, pool, limiter)
    }

    #[tokio::test]
    async fn test_window_ceiling_and_rollover() {
        let (_dir, _pool, limiter) = setup(5, 500);
        for i in 0..5 {
            assert!(limiter.try_acquire_at(t0() + Duration::seconds(i)).await);
        }
        assert!(!limiter.try_acquire_at(t0() + Duration::seconds(30)).await);
        assert!(limiter.try_acquire_at(t0() + Duration::seconds(60)).await);
        assert_eq!(limiter.remaining_budget_at(t0() + Duration::seconds(60)).await, 0);
    }

    #[tokio::test]
    async fn test_daily_ceiling_resets_at_utc_midnight() {
        let (_dir, _pool, limiter) = setup(5, 3);
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 23, 50, 0).unwrap();
        for minute in 0..5 {
            limiter.try_acquire_at(late + Duration::minutes(minute)).await;
        }
        let usage = limiter.usage_at(late + Duration::minutes(5)).await.unwrap();
        assert_eq!(usage.day_used, 3);

        let next_day = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 30).unwrap();
        assert!(limiter.try_acquire_at(next_day).await);
        assert_eq!(limiter.usage_at(next_day).await.unwrap().day_used, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_limiters_share_one_budget() {
        let (_dir, pool, first) = setup(5, 500);
        let second = RateLimiter::new(
            Arc::new(SqliteRateLimitStore::new(Arc::clone(&pool))),
            *first.limits(),
        );

        let now = t0();
        let attempts: Vec<_> = (0..12)
            .map(|i| {
                let limiter = if i % 2 == 0 { first.clone() } else { second.clone() };
                tokio::spawn(async move { limiter.try_acquire_at(now).await })
            })
            .collect();

        let mut granted = 0;
        for attempt in attempts {
            if attempt.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 5);
    }
}
