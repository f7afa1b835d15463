pub mod activity;
pub mod items;
pub mod schema;
pub mod sessions;
pub mod templates;

use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Connection;

use crate::domain::{
    DailyActivityRecord, EngagementTier, NotificationTemplate, ReviewItem, SessionSummary, TemplatePatch,
};
use crate::error::{StoreError, StoreResult};
use crate::store::{ReviewStore, TemplateStore};

pub use schema::{run_catalog_migrations, run_migrations};

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
    /// Log the error at warn level and return the default
    fn log_warn_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }

    fn log_warn_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                T::default()
            }
        }
    }
}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> StoreResult<MutexGuard<'_, Connection>> {
    pool.lock().map_err(|_| {
        tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
        StoreError::Lock
    })
}

/// Fixed-width UTC timestamp so text order matches time order
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

pub(crate) fn parse_ts_opt(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Open (creating if needed) a SQLite file and run `migrate` on it
fn open_db(path: &Path, migrate: fn(&Connection) -> rusqlite::Result<()>) -> StoreResult<DbPool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    // Create backup before migrations if database exists
    if path.exists() {
        let backup_path = path.with_extension("db.backup");
        if let Err(e) = std::fs::copy(path, &backup_path) {
            tracing::warn!("Could not create database backup: {}", e);
        }
    }

    let conn = Connection::open(path)?;
    migrate(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// SQLite-backed store. One instance per learner database, or one for the
/// shared template catalog.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Open a learner's learning.db
    pub fn open_learner(path: &Path) -> StoreResult<Self> {
        Ok(Self {
            pool: open_db(path, run_migrations)?,
        })
    }

    /// Open the shared catalog app.db
    pub fn open_catalog(path: &Path) -> StoreResult<Self> {
        Ok(Self {
            pool: open_db(path, run_catalog_migrations)?,
        })
    }

    /// In-memory database with both schemas, for tools and tests
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        run_catalog_migrations(&conn)?;
        Ok(Self {
            pool: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        try_lock(&self.pool)
    }

    /// Insert or replace a catalog template
    pub fn save_template(&self, template: &NotificationTemplate) -> StoreResult<()> {
        let conn = self.conn()?;
        templates::save_template(&conn, template)?;
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for SqliteStore {
    async fn fetch_due(&self, now: DateTime<Utc>, limit: usize) -> StoreResult<Vec<ReviewItem>> {
        let conn = self.conn()?;
        Ok(items::get_due_items(&conn, now, limit)?)
    }

    async fn fetch_new(&self, limit: usize) -> StoreResult<Vec<ReviewItem>> {
        let conn = self.conn()?;
        Ok(items::get_new_items(&conn, limit)?)
    }

    async fn count_due(&self, now: DateTime<Utc>) -> StoreResult<i64> {
        let conn = self.conn()?;
        Ok(items::get_due_count(&conn, now)?)
    }

    async fn insert_item(&self, item: &ReviewItem) -> StoreResult<()> {
        let conn = self.conn()?;
        Ok(items::insert_item(&conn, item)?)
    }

    async fn upsert_item(&self, item: &ReviewItem) -> StoreResult<()> {
        let conn = self.conn()?;
        Ok(items::upsert_item(&conn, item)?)
    }

    async fn upsert_session(&self, summary: &SessionSummary) -> StoreResult<()> {
        let conn = self.conn()?;
        Ok(sessions::upsert_session_summary(&conn, summary)?)
    }

    async fn fetch_activity(&self, range: RangeInclusive<NaiveDate>) -> StoreResult<Vec<DailyActivityRecord>> {
        let conn = self.conn()?;
        Ok(activity::get_activity_range(&conn, *range.start(), *range.end())?)
    }

    async fn upsert_activity(&self, record: &DailyActivityRecord) -> StoreResult<()> {
        let conn = self.conn()?;
        Ok(activity::upsert_activity(&conn, record)?)
    }
}

#[async_trait]
impl TemplateStore for SqliteStore {
    async fn fetch_templates(&self, tier: EngagementTier) -> StoreResult<Vec<NotificationTemplate>> {
        let conn = self.conn()?;
        Ok(templates::get_templates_for_tier(&conn, tier)?)
    }

    async fn update_template(&self, id: &str, patch: TemplatePatch) -> StoreResult<NotificationTemplate> {
        let conn = self.conn()?;
        let mut template =
            templates::get_template(&conn, id)?.ok_or_else(|| StoreError::TemplateNotFound(id.to_string()))?;
        patch.apply(&mut template);
        templates::save_template(&conn, &template)?;
        Ok(template)
    }
}
