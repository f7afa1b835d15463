//! Notification template catalog

use rusqlite::{params, Connection, OptionalExtension, Result};

use super::{format_ts, parse_ts_opt};
use crate::domain::{EngagementTier, NotificationTemplate};

const TEMPLATE_COLUMNS: &str = "id, text, tier, click_through, impressions, clicks, last_used_at";

/// Insert or fully replace a template
pub fn save_template(conn: &Connection, template: &NotificationTemplate) -> Result<()> {
    conn.execute(
        r#"
    INSERT OR REPLACE INTO notification_templates
      (id, text, tier, click_through, impressions, clicks, last_used_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    "#,
        params![
            template.id,
            template.text,
            template.tier.as_str(),
            to_json(&template.click_through)?,
            to_json(&template.impressions)?,
            to_json(&template.clicks)?,
            template.last_used_at.map(format_ts),
        ],
    )?;
    Ok(())
}

pub fn get_template(conn: &Connection, id: &str) -> Result<Option<NotificationTemplate>> {
    conn.query_row(
        &format!("SELECT {TEMPLATE_COLUMNS} FROM notification_templates WHERE id = ?1"),
        params![id],
        row_to_template,
    )
    .optional()
}

pub fn get_templates_for_tier(conn: &Connection, tier: EngagementTier) -> Result<Vec<NotificationTemplate>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM notification_templates WHERE tier = ?1 ORDER BY id ASC"
    ))?;

    let templates = stmt
        .query_map(params![tier.as_str()], row_to_template)?
        .collect::<Result<Vec<_>>>()?;

    Ok(templates)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn from_json<T: serde::de::DeserializeOwned>(row: &rusqlite::Row, idx: usize) -> Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn row_to_template(row: &rusqlite::Row) -> Result<NotificationTemplate> {
    let raw_tier: String = row.get(2)?;
    let tier = EngagementTier::from_str(&raw_tier).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown tier '{}'", raw_tier).into(),
        )
    })?;

    Ok(NotificationTemplate {
        id: row.get(0)?,
        text: row.get(1)?,
        tier,
        click_through: from_json(row, 3)?,
        impressions: from_json(row, 4)?,
        clicks: from_json(row, 5)?,
        last_used_at: parse_ts_opt(row, 6)?,
    })
}
