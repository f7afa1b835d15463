//! Persistence collaborator contracts.
//!
//! The engine never talks to a database directly; it goes through these
//! traits. [`crate::db::SqliteStore`] is the bundled implementation.

use std::ops::RangeInclusive;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    DailyActivityRecord, EngagementTier, NotificationTemplate, ReviewItem, SessionSummary, TemplatePatch,
};
use crate::error::StoreResult;

/// Per-learner data: review items, session history and daily activity
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Reviewed items with `next_due_at <= now`, most overdue first
    async fn fetch_due(&self, now: DateTime<Utc>, limit: usize) -> StoreResult<Vec<ReviewItem>>;

    /// Never-reviewed items, oldest first
    async fn fetch_new(&self, limit: usize) -> StoreResult<Vec<ReviewItem>>;

    /// Number of items `fetch_due` would return without a limit
    async fn count_due(&self, now: DateTime<Utc>) -> StoreResult<i64>;

    /// Add an authored item
    async fn insert_item(&self, item: &ReviewItem) -> StoreResult<()>;

    /// Write an item's scheduling state (insert if missing)
    async fn upsert_item(&self, item: &ReviewItem) -> StoreResult<()>;

    /// Write a session summary, replacing any earlier write for the same session
    async fn upsert_session(&self, summary: &SessionSummary) -> StoreResult<()>;

    /// Activity records whose date falls inside `range`, ascending by date
    async fn fetch_activity(&self, range: RangeInclusive<NaiveDate>) -> StoreResult<Vec<DailyActivityRecord>>;

    /// Create or replace one day's record
    async fn upsert_activity(&self, record: &DailyActivityRecord) -> StoreResult<()>;
}

/// Shared catalog of re-engagement messages
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Templates authored for `tier`
    async fn fetch_templates(&self, tier: EngagementTier) -> StoreResult<Vec<NotificationTemplate>>;

    /// Apply `patch` to one template and return its new state
    async fn update_template(&self, id: &str, patch: TemplatePatch) -> StoreResult<NotificationTemplate>;
}
