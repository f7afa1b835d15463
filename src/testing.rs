//! Test utilities for store setup.
//!
//! Provides an instrumented store wrapper and an on-disk test environment
//! that reuse the authoritative schema initialization.

use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tempfile::TempDir;

use crate::db::SqliteStore;
use crate::domain::{
    DailyActivityRecord, EngagementTier, NotificationTemplate, ReviewItem, SessionSummary, TemplatePatch,
};
use crate::error::{StoreError, StoreResult};
use crate::store::{ReviewStore, TemplateStore};

/// SQLite store that counts calls and can be told to fail
pub struct CountingStore {
    pub inner: SqliteStore,
    reads: AtomicUsize,
    item_writes: AtomicUsize,
    session_writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_item_writes: AtomicBool,
    item_write_delay_ms: AtomicU64,
}

impl CountingStore {
    pub fn in_memory() -> Self {
        Self::wrap(SqliteStore::open_in_memory().expect("in-memory store"))
    }

    pub fn wrap(inner: SqliteStore) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            item_writes: AtomicUsize::new(0),
            session_writes: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_item_writes: AtomicBool::new(false),
            item_write_delay_ms: AtomicU64::new(0),
        }
    }

    /// Store queries served (due, new, count)
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn item_writes(&self) -> usize {
        self.item_writes.load(Ordering::SeqCst)
    }

    pub fn session_writes(&self) -> usize {
        self.session_writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_item_writes(&self, fail: bool) {
        self.fail_item_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every item save sleep before writing
    pub fn slow_item_writes(&self, delay: Duration) {
        self.item_write_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn read(&self) -> StoreResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Lock);
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for CountingStore {
    async fn fetch_due(&self, now: DateTime<Utc>, limit: usize) -> StoreResult<Vec<ReviewItem>> {
        self.read()?;
        self.inner.fetch_due(now, limit).await
    }

    async fn fetch_new(&self, limit: usize) -> StoreResult<Vec<ReviewItem>> {
        self.read()?;
        self.inner.fetch_new(limit).await
    }

    async fn count_due(&self, now: DateTime<Utc>) -> StoreResult<i64> {
        self.read()?;
        self.inner.count_due(now).await
    }

    async fn insert_item(&self, item: &ReviewItem) -> StoreResult<()> {
        self.inner.insert_item(item).await
    }

    async fn upsert_item(&self, item: &ReviewItem) -> StoreResult<()> {
        self.item_writes.fetch_add(1, Ordering::SeqCst);
        let delay = self.item_write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_item_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Lock);
        }
        self.inner.upsert_item(item).await
    }

    async fn upsert_session(&self, summary: &SessionSummary) -> StoreResult<()> {
        self.session_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert_session(summary).await
    }

    async fn fetch_activity(&self, range: RangeInclusive<NaiveDate>) -> StoreResult<Vec<DailyActivityRecord>> {
        self.inner.fetch_activity(range).await
    }

    async fn upsert_activity(&self, record: &DailyActivityRecord) -> StoreResult<()> {
        self.inner.upsert_activity(record).await
    }
}

#[async_trait]
impl TemplateStore for CountingStore {
    async fn fetch_templates(&self, tier: EngagementTier) -> StoreResult<Vec<NotificationTemplate>> {
        self.read()?;
        self.inner.fetch_templates(tier).await
    }

    async fn update_template(&self, id: &str, patch: TemplatePatch) -> StoreResult<NotificationTemplate> {
        self.inner.update_template(id, patch).await
    }
}

/// On-disk data directory with a catalog and one learner database.
///
/// Everything is removed when dropped.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub catalog: SqliteStore,
    pub learner: SqliteStore,
}

impl TestEnv {
    pub const LEARNER: &'static str = "learner";

    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let layout = crate::paths::DataLayout::new(temp.path());

        let catalog = SqliteStore::open_catalog(&layout.catalog_db_path()).expect("Failed to open catalog");
        let learner =
            SqliteStore::open_learner(&layout.learner_db_path(Self::LEARNER)).expect("Failed to open learner db");

        Self { temp, catalog, learner }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}
