//! Engagement tiers from the trailing week of activity.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

use crate::config::{ENGAGEMENT_WINDOW_DAYS, HIGH_TIER_MIN_ACTIVE_DAYS, MEDIUM_TIER_MIN_ACTIVE_DAYS};
use crate::domain::{DailyActivityRecord, EngagementTier};
use crate::error::StoreResult;
use crate::store::ReviewStore;

/// First day of the window ending on `today` (inclusive)
pub fn window_start(today: NaiveDate) -> NaiveDate {
  today - Duration::days(ENGAGEMENT_WINDOW_DAYS - 1)
}

/// Distinct days inside the window with at least one review.
///
/// Records outside the window are ignored and a day listed twice counts once.
pub fn active_days(records: &[DailyActivityRecord], today: NaiveDate) -> usize {
  let start = window_start(today);
  records
    .iter()
    .filter(|r| r.date >= start && r.date <= today && r.is_active())
    .map(|r| r.date)
    .collect::<BTreeSet<_>>()
    .len()
}

pub fn tier_for_active_days(days: usize) -> EngagementTier {
  if days >= HIGH_TIER_MIN_ACTIVE_DAYS {
    EngagementTier::High
  } else if days >= MEDIUM_TIER_MIN_ACTIVE_DAYS {
    EngagementTier::Medium
  } else {
    EngagementTier::Low
  }
}

/// Classify a learner from their activity records. Missing days are inactive.
pub fn classify(records: &[DailyActivityRecord], today: NaiveDate) -> EngagementTier {
  tier_for_active_days(active_days(records, today))
}

/// Load the trailing window from the store and classify it
pub async fn classify_engagement(store: &dyn ReviewStore, today: NaiveDate) -> StoreResult<EngagementTier> {
  let records = store.fetch_activity(window_start(today)..=today).await?;
  let tier = classify(&records, today);
  tracing::debug!(
    active_days = active_days(&records, today),
    tier = tier.as_str(),
    "classified engagement"
  );
  Ok(tier)
}
