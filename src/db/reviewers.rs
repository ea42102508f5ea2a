//! Stored reviewers.
//!
//! Successful generations are kept per user so the study modes can reload
//! them later. The reviewer body is stored as its response-contract JSON.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

/// Listing row, without the (potentially large) body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerSummary {
    pub id: i64,
    pub title: String,
    pub extraction_mode: String,
    pub created_at: DateTime<Utc>,
}

/// Full stored row.
#[derive(Debug, Clone)]
pub struct StoredReviewer {
    pub id: i64,
    pub title: String,
    pub extraction_mode: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

pub fn insert_reviewer(
    conn: &Connection,
    user_id: &str,
    title: &str,
    extraction_mode: &str,
    body: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        r#"
    INSERT INTO reviewers (user_id, title, extraction_mode, body, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    "#,
        params![user_id, title, extraction_mode, body, now.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Newest first.
pub fn list_reviewers(conn: &Connection, user_id: &str) -> Result<Vec<ReviewerSummary>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT id, title, extraction_mode, created_at
    FROM reviewers
    WHERE user_id = ?1
    ORDER BY id DESC
    "#,
    )?;

    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok(ReviewerSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                extraction_mode: row.get(2)?,
                created_at: parse_timestamp(row.get(3)?),
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn get_reviewer(conn: &Connection, user_id: &str, id: i64) -> Result<Option<StoredReviewer>> {
    conn.query_row(
        r#"
    SELECT id, title, extraction_mode, body, created_at
    FROM reviewers
    WHERE user_id = ?1 AND id = ?2
    "#,
        params![user_id, id],
        |row| {
            Ok(StoredReviewer {
                id: row.get(0)?,
                title: row.get(1)?,
                extraction_mode: row.get(2)?,
                body: row.get(3)?,
                created_at: parse_timestamp(row.get(4)?),
            })
        },
    )
    .optional()
}

/// Returns whether a row was actually removed.
pub fn delete_reviewer(conn: &Connection, user_id: &str, id: i64) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM reviewers WHERE user_id = ?1 AND id = ?2",
        params![user_id, id],
    )?;
    Ok(deleted > 0)
}

fn parse_timestamp(raw: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}
