//! The daily quota counter.
//!
//! The check and the increment are one SQL statement: the upsert only
//! succeeds while `used` is still below the cap, so two concurrent requests
//! can never both pass on a stale read. SQLite owns the atomicity; there is
//! no client-side read-modify-write.

use chrono::{DateTime, Days, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};

/// Outcome of one quota check. Immutable after creation; `remaining` is the
/// post-increment value when `allowed`, otherwise 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub remaining: i64,
    pub reset_at: DateTime<Utc>,
}

/// Atomically charge one unit of the caller's daily allowance.
///
/// On success the counter is already durably incremented when this returns,
/// so a generation that later fails has still consumed its unit.
pub fn check_and_reserve(
    conn: &Connection,
    user_id: &str,
    cap: i64,
    now: DateTime<Utc>,
) -> Result<QuotaDecision> {
    let day = day_key(now);
    let used: Option<i64> = conn
        .query_row(
            r#"
      INSERT INTO daily_usage (user_id, day, used) VALUES (?1, ?2, 1)
      ON CONFLICT(user_id, day) DO UPDATE SET used = used + 1 WHERE daily_usage.used < ?3
      RETURNING used
      "#,
            params![user_id, day, cap],
            |row| row.get(0),
        )
        .optional()?;

    let reset_at = next_utc_midnight(now);
    match used {
        Some(used) => Ok(QuotaDecision {
            allowed: true,
            remaining: (cap - used).max(0),
            reset_at,
        }),
        None => Ok(QuotaDecision {
            allowed: false,
            remaining: 0,
            reset_at,
        }),
    }
}

/// Report the caller's remaining allowance without consuming a unit.
pub fn peek_usage(
    conn: &Connection,
    user_id: &str,
    cap: i64,
    now: DateTime<Utc>,
) -> Result<QuotaDecision> {
    let day = day_key(now);
    let used: i64 = conn
        .query_row(
            "SELECT used FROM daily_usage WHERE user_id = ?1 AND day = ?2",
            params![user_id, day],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);

    let remaining = (cap - used).max(0);
    Ok(QuotaDecision {
        allowed: remaining > 0,
        remaining,
        reset_at: next_utc_midnight(now),
    })
}

/// Counter key for the UTC day containing `now`.
fn day_key(now: DateTime<Utc>) -> String {
    now.date_naive().format("%Y-%m-%d").to_string()
}

/// Start of the next UTC day, when the counter rolls over.
fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    (now.date_naive() + Days::new(1))
        .and_time(NaiveTime::MIN)
        .and_utc()
}
