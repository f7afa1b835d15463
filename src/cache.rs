//! Short-lived read-through cache in front of the review store.
//!
//! Covers the three hot reads of session composition: due items, new items
//! and the due count. One lock guards all three slots, and it is held across
//! the underlying query so concurrent readers of a cold slot issue a single
//! store call. Entries may be up to one TTL stale; writes call
//! [`ReviewCache::invalidate_all`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::ReviewItem;
use crate::error::StoreResult;
use crate::store::ReviewStore;

struct Cached<T> {
    value: T,
    /// Limit the value was fetched with (item queries only)
    limit: usize,
    cached_at: Instant,
}

impl<T: Clone> Cached<T> {
    fn fresh(&self, ttl: Duration, limit: usize) -> Option<T> {
        if self.limit == limit && self.cached_at.elapsed() < ttl {
            Some(self.value.clone())
        } else {
            None
        }
    }
}

#[derive(Default)]
struct Slots {
    due_items: Option<Cached<Vec<ReviewItem>>>,
    new_items: Option<Cached<Vec<ReviewItem>>>,
    due_count: Option<Cached<i64>>,
}

pub struct ReviewCache {
    store: Arc<dyn ReviewStore>,
    ttl: Duration,
    slots: Mutex<Slots>,
}

impl ReviewCache {
    pub fn new(store: Arc<dyn ReviewStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Underlying store, for writes that bypass the cache
    pub fn store(&self) -> &Arc<dyn ReviewStore> {
        &self.store
    }

    pub async fn due_items(&self, now: DateTime<Utc>, limit: usize) -> StoreResult<Vec<ReviewItem>> {
        let mut slots = self.slots.lock().await;
        if let Some(hit) = slots.due_items.as_ref().and_then(|c| c.fresh(self.ttl, limit)) {
            tracing::debug!(limit, "due items served from cache");
            return Ok(hit);
        }

        let value = self.store.fetch_due(now, limit).await?;
        tracing::debug!(limit, fetched = value.len(), "due items fetched");
        slots.due_items = Some(Cached {
            value: value.clone(),
            limit,
            cached_at: Instant::now(),
        });
        Ok(value)
    }

    pub async fn new_items(&self, limit: usize) -> StoreResult<Vec<ReviewItem>> {
        let mut slots = self.slots.lock().await;
        if let Some(hit) = slots.new_items.as_ref().and_then(|c| c.fresh(self.ttl, limit)) {
            tracing::debug!(limit, "new items served from cache");
            return Ok(hit);
        }

        let value = self.store.fetch_new(limit).await?;
        tracing::debug!(limit, fetched = value.len(), "new items fetched");
        slots.new_items = Some(Cached {
            value: value.clone(),
            limit,
            cached_at: Instant::now(),
        });
        Ok(value)
    }

    pub async fn due_count(&self, now: DateTime<Utc>) -> StoreResult<i64> {
        let mut slots = self.slots.lock().await;
        if let Some(hit) = slots.due_count.as_ref().and_then(|c| c.fresh(self.ttl, 0)) {
            return Ok(hit);
        }

        let value = self.store.count_due(now).await?;
        slots.due_count = Some(Cached {
            value,
            limit: 0,
            cached_at: Instant::now(),
        });
        Ok(value)
    }

    /// Drop all three slots
    pub async fn invalidate_all(&self) {
        let mut slots = self.slots.lock().await;
        *slots = Slots::default();
        tracing::debug!("review cache invalidated");
    }
}
