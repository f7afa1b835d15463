use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::EngagementTier;

/// Candidate re-engagement message.
///
/// `tier` is the audience the template was written for; the per-tier maps
/// record how it performed with every tier it has been shown to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationTemplate {
  pub id: String,
  pub text: String,
  pub tier: EngagementTier,
  #[serde(default)]
  pub click_through: BTreeMap<EngagementTier, f64>,
  #[serde(default)]
  pub impressions: BTreeMap<EngagementTier, i64>,
  #[serde(default)]
  pub clicks: BTreeMap<EngagementTier, i64>,
  pub last_used_at: Option<DateTime<Utc>>,
}

impl NotificationTemplate {
  pub fn new(id: impl Into<String>, text: impl Into<String>, tier: EngagementTier) -> Self {
    Self {
      id: id.into(),
      text: text.into(),
      tier,
      click_through: BTreeMap::new(),
      impressions: BTreeMap::new(),
      clicks: BTreeMap::new(),
      last_used_at: None,
    }
  }

  /// Recorded click-through rate for a tier, 0.0 when never measured
  pub fn rate_for(&self, tier: EngagementTier) -> f64 {
    self.click_through.get(&tier).copied().unwrap_or(0.0)
  }
}

/// Mutation applied by the catalog to a single template
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemplatePatch {
  /// Template was sent to a learner of `tier`
  MarkSent { at: DateTime<Utc>, tier: EngagementTier },
  /// A learner of `tier` clicked; rate moves `step` of the way toward 1.0
  RecordClick { tier: EngagementTier, step: f64 },
}

impl TemplatePatch {
  pub fn apply(&self, template: &mut NotificationTemplate) {
    match *self {
      TemplatePatch::MarkSent { at, tier } => {
        template.last_used_at = Some(at);
        *template.impressions.entry(tier).or_insert(0) += 1;
      }
      TemplatePatch::RecordClick { tier, step } => {
        let step = step.clamp(0.0, 1.0);
        let rate = template.rate_for(tier);
        template
          .click_through
          .insert(tier, (rate + step * (1.0 - rate)).clamp(0.0, 1.0));
        *template.clicks.entry(tier).or_insert(0) += 1;
      }
    }
  }
}
