//! Review item CRUD and scheduling queries

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result, ToSql};

use super::{format_ts, parse_ts, parse_ts_opt};
use crate::domain::ReviewItem;

const ITEM_COLUMNS: &str = r#"
    id, prompt, answer, metadata, created_at, ease_factor, interval_days, next_due_at,
    last_reviewed_at, times_reviewed, times_correct, times_incorrect, dirty
"#;

pub fn insert_item(conn: &Connection, item: &ReviewItem) -> Result<()> {
    conn.execute(
        r#"
    INSERT INTO review_items (id, prompt, answer, metadata, created_at, ease_factor, interval_days,
                              next_due_at, last_reviewed_at, times_reviewed, times_correct,
                              times_incorrect, dirty)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
    "#,
        params_from_iter(item_params(item)?),
    )?;
    Ok(())
}

pub fn upsert_item(conn: &Connection, item: &ReviewItem) -> Result<()> {
    conn.execute(
        r#"
    INSERT INTO review_items (id, prompt, answer, metadata, created_at, ease_factor, interval_days,
                              next_due_at, last_reviewed_at, times_reviewed, times_correct,
                              times_incorrect, dirty)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
    ON CONFLICT(id) DO UPDATE SET
      prompt = excluded.prompt,
      answer = excluded.answer,
      metadata = excluded.metadata,
      ease_factor = excluded.ease_factor,
      interval_days = excluded.interval_days,
      next_due_at = excluded.next_due_at,
      last_reviewed_at = excluded.last_reviewed_at,
      times_reviewed = excluded.times_reviewed,
      times_correct = excluded.times_correct,
      times_incorrect = excluded.times_incorrect,
      dirty = excluded.dirty
    "#,
        params_from_iter(item_params(item)?),
    )?;
    Ok(())
}

pub fn get_item_by_id(conn: &Connection, id: &str) -> Result<Option<ReviewItem>> {
    conn.query_row(
        &format!("SELECT {ITEM_COLUMNS} FROM review_items WHERE id = ?1"),
        params![id],
        row_to_item,
    )
    .optional()
}

/// Reviewed items that are due, most overdue first
pub fn get_due_items(conn: &Connection, now: DateTime<Utc>, limit: usize) -> Result<Vec<ReviewItem>> {
    let mut stmt = conn.prepare(&format!(
        r#"
    SELECT {ITEM_COLUMNS}
    FROM review_items
    WHERE times_reviewed > 0 AND next_due_at <= ?1
    ORDER BY next_due_at ASC, id ASC
    LIMIT ?2
    "#
    ))?;

    let items = stmt
        .query_map(params![format_ts(now), limit as i64], row_to_item)?
        .collect::<Result<Vec<_>>>()?;
    Ok(items)
}

/// Never-reviewed items in authoring order
pub fn get_new_items(conn: &Connection, limit: usize) -> Result<Vec<ReviewItem>> {
    let mut stmt = conn.prepare(&format!(
        r#"
    SELECT {ITEM_COLUMNS}
    FROM review_items
    WHERE times_reviewed = 0
    ORDER BY created_at ASC, id ASC
    LIMIT ?1
    "#
    ))?;

    let items = stmt
        .query_map(params![limit as i64], row_to_item)?
        .collect::<Result<Vec<_>>>()?;
    Ok(items)
}

pub fn get_due_count(conn: &Connection, now: DateTime<Utc>) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM review_items WHERE times_reviewed > 0 AND next_due_at <= ?1",
        params![format_ts(now)],
        |row| row.get(0),
    )
}

fn item_params(item: &ReviewItem) -> Result<Vec<Box<dyn ToSql>>> {
    let metadata = serde_json::to_string(&item.metadata)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    Ok(vec![
        Box::new(item.id.clone()),
        Box::new(item.prompt.clone()),
        Box::new(item.answer.clone()),
        Box::new(metadata),
        Box::new(format_ts(item.created_at)),
        Box::new(item.ease_factor),
        Box::new(item.interval_days),
        Box::new(format_ts(item.next_due_at)),
        Box::new(item.last_reviewed_at.map(format_ts)),
        Box::new(item.times_reviewed),
        Box::new(item.times_correct),
        Box::new(item.times_incorrect),
        Box::new(item.dirty),
    ])
}

/// Convert a database row to ReviewItem
fn row_to_item(row: &rusqlite::Row) -> Result<ReviewItem> {
    let metadata: String = row.get(3)?;
    let metadata = serde_json::from_str(&metadata).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(ReviewItem {
        id: row.get(0)?,
        prompt: row.get(1)?,
        answer: row.get(2)?,
        metadata,
        created_at: parse_ts(row, 4)?,
        ease_factor: row.get(5)?,
        interval_days: row.get(6)?,
        next_due_at: parse_ts(row, 7)?,
        last_reviewed_at: parse_ts_opt(row, 8)?,
        times_reviewed: row.get(9)?,
        times_correct: row.get(10)?,
        times_incorrect: row.get(11)?,
        dirty: row.get(12)?,
    })
}
