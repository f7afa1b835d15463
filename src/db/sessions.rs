//! Session history

use rusqlite::{params, Connection, OptionalExtension, Result};
use uuid::Uuid;

use super::{format_ts, parse_ts};
use crate::domain::SessionSummary;

/// Write a summary keyed by session id; a repeated write replaces the row
pub fn upsert_session_summary(conn: &Connection, summary: &SessionSummary) -> Result<()> {
    conn.execute(
        r#"
    INSERT OR REPLACE INTO session_summaries
      (session_id, started_at, ended_at, elapsed_secs, items_queued, items_graded,
       correct, incorrect, items_learned, remaining_due, aborted)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    "#,
        params![
            summary.session_id.to_string(),
            format_ts(summary.started_at),
            format_ts(summary.ended_at),
            summary.elapsed_secs,
            summary.items_queued,
            summary.items_graded,
            summary.correct,
            summary.incorrect,
            summary.items_learned,
            summary.remaining_due,
            summary.aborted,
        ],
    )?;
    Ok(())
}

pub fn get_session_summary(conn: &Connection, session_id: Uuid) -> Result<Option<SessionSummary>> {
    conn.query_row(
        r#"
    SELECT session_id, started_at, ended_at, elapsed_secs, items_queued, items_graded,
           correct, incorrect, items_learned, remaining_due, aborted
    FROM session_summaries
    WHERE session_id = ?1
    "#,
        params![session_id.to_string()],
        row_to_summary,
    )
    .optional()
}

pub fn count_session_summaries(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM session_summaries", [], |row| row.get(0))
}

/// Convert a database row to SessionSummary
fn row_to_summary(row: &rusqlite::Row) -> Result<SessionSummary> {
    let raw_id: String = row.get(0)?;
    let session_id = Uuid::parse_str(&raw_id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(SessionSummary {
        session_id,
        started_at: parse_ts(row, 1)?,
        ended_at: parse_ts(row, 2)?,
        elapsed_secs: row.get(3)?,
        items_queued: row.get(4)?,
        items_graded: row.get(5)?,
        correct: row.get(6)?,
        incorrect: row.get(7)?,
        items_learned: row.get(8)?,
        remaining_due: row.get(9)?,
        aborted: row.get(10)?,
    })
}
