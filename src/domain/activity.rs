use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One calendar day of study for a learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActivityRecord {
  pub date: NaiveDate,
  pub minutes_studied: i64,
  pub items_reviewed: i64,
  pub items_learned: i64,
  /// 0.0 - 100.0
  pub accuracy_percentage: f64,
}

impl DailyActivityRecord {
  pub fn empty(date: NaiveDate) -> Self {
    Self {
      date,
      minutes_studied: 0,
      items_reviewed: 0,
      items_learned: 0,
      accuracy_percentage: 0.0,
    }
  }

  pub fn is_active(&self) -> bool {
    self.items_reviewed > 0
  }

  /// Fold a finished session into this day's totals.
  ///
  /// Accuracy becomes the review-weighted mean of the old and new figures.
  pub fn absorb(&mut self, minutes: i64, reviewed: i64, learned: i64, correct: i64) {
    if reviewed <= 0 {
      return;
    }
    let previous_correct = self.accuracy_percentage / 100.0 * self.items_reviewed as f64;
    self.items_reviewed += reviewed;
    self.items_learned += learned;
    self.minutes_studied += minutes.max(0);
    self.accuracy_percentage =
      ((previous_correct + correct as f64) / self.items_reviewed as f64 * 100.0).clamp(0.0, 100.0);
  }
}

/// Coarse activity level, always recomputed from the trailing window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementTier {
  High,
  Medium,
  Low,
}

impl EngagementTier {
  pub const ALL: [EngagementTier; 3] = [Self::High, Self::Medium, Self::Low];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::High => "high",
      Self::Medium => "medium",
      Self::Low => "low",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "high" => Some(Self::High),
      "medium" => Some(Self::Medium),
      "low" => Some(Self::Low),
      _ => None,
    }
  }
}

impl std::fmt::Display for EngagementTier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}
