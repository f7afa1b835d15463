//! Session composition: how many new vs. due items a practice session gets,
//! and building the shuffled queue from the review cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;

use crate::cache::ReviewCache;
use crate::config::NEW_ITEM_CEILING;
use crate::domain::ReviewItem;
use crate::error::StoreResult;

/// Item budget for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPlan {
  pub target: usize,
  pub new_item_cap: usize,
  pub review_count: usize,
}

/// Split a session target into new and review budgets.
///
/// New items get 30% of the target, never more than 7.
pub fn plan_session(target: usize) -> SessionPlan {
  // floor(target * 0.3) without float rounding
  let new_item_cap = (target.saturating_mul(3) / 10).min(NEW_ITEM_CEILING);
  SessionPlan {
    target,
    new_item_cap,
    review_count: target - new_item_cap,
  }
}

/// Items picked for a session, already shuffled
#[derive(Debug, Clone)]
pub struct ComposedQueue {
  pub items: Vec<ReviewItem>,
  pub review_count: usize,
  pub new_count: usize,
}

/// Fetch due and new items within the plan and shuffle them together.
///
/// Returns `None` when nothing is due and nothing is new. Fewer items than
/// the target is not an error; the queue is simply shorter.
pub async fn compose_queue(
  cache: &Arc<ReviewCache>,
  plan: SessionPlan,
  now: DateTime<Utc>,
) -> StoreResult<Option<ComposedQueue>> {
  let due = if plan.review_count > 0 {
    cache.due_items(now, plan.review_count).await?
  } else {
    Vec::new()
  };
  let fresh = if plan.new_item_cap > 0 {
    cache.new_items(plan.new_item_cap).await?
  } else {
    Vec::new()
  };

  if due.is_empty() && fresh.is_empty() {
    return Ok(None);
  }

  let review_count = due.len().min(plan.review_count);
  let new_count = fresh.len().min(plan.new_item_cap);

  let mut items: Vec<ReviewItem> = due
    .into_iter()
    .take(review_count)
    .chain(fresh.into_iter().take(new_count))
    .collect();
  items.shuffle(&mut rand::rng());

  tracing::debug!(review_count, new_count, target = plan.target, "composed session queue");

  Ok(Some(ComposedQueue {
    items,
    review_count,
    new_count,
  }))
}
