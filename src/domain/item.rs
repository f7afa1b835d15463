use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{INITIAL_EASE_FACTOR, PASSING_QUALITY};
use crate::error::ScheduleError;

/// One learnable unit and its scheduling state.
///
/// Content fields are opaque to scheduling. Scheduling fields are only
/// changed through [`crate::srs::review_item`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
  pub id: String,
  pub prompt: String,
  pub answer: String,
  #[serde(default)]
  pub metadata: serde_json::Value,
  pub created_at: DateTime<Utc>,

  // SM-2 state
  pub ease_factor: f64,
  pub interval_days: i64,
  pub next_due_at: DateTime<Utc>,
  pub last_reviewed_at: Option<DateTime<Utc>>,

  // Stats (times_reviewed == times_correct + times_incorrect)
  pub times_reviewed: i64,
  pub times_correct: i64,
  pub times_incorrect: i64,

  /// Changed locally but not yet confirmed persisted remotely
  pub dirty: bool,
}

impl ReviewItem {
  /// Freshly authored item, due immediately and never reviewed
  pub fn new(id: impl Into<String>, prompt: impl Into<String>, answer: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self {
      id: id.into(),
      prompt: prompt.into(),
      answer: answer.into(),
      metadata: serde_json::Value::Null,
      created_at: now,
      ease_factor: INITIAL_EASE_FACTOR,
      interval_days: 1,
      next_due_at: now,
      last_reviewed_at: None,
      times_reviewed: 0,
      times_correct: 0,
      times_incorrect: 0,
      dirty: false,
    }
  }

  pub fn is_new(&self) -> bool {
    self.times_reviewed == 0
  }

  /// Reviewed before and scheduled at or before `now`. New items are never due.
  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    !self.is_new() && self.next_due_at <= now
  }

  /// Share of reviews recalled correctly, 0.0 for unreviewed items
  pub fn accuracy(&self) -> f64 {
    if self.times_reviewed > 0 {
      self.times_correct as f64 / self.times_reviewed as f64
    } else {
      0.0
    }
  }
}

/// Named buckets of the 0-5 recall scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReviewQuality {
  Blackout = 0,
  Wrong = 1,
  Familiar = 2,
  Hard = 3,
  Good = 4,
  Perfect = 5,
}

impl ReviewQuality {
  pub fn from_u8(value: u8) -> Result<Self, ScheduleError> {
    match value {
      0 => Ok(Self::Blackout),
      1 => Ok(Self::Wrong),
      2 => Ok(Self::Familiar),
      3 => Ok(Self::Hard),
      4 => Ok(Self::Good),
      5 => Ok(Self::Perfect),
      _ => Err(ScheduleError::InvalidQuality(value)),
    }
  }

  pub fn value(self) -> u8 {
    self as u8
  }

  /// 3 and above count as a correct recall
  pub fn is_correct(self) -> bool {
    self.value() >= PASSING_QUALITY
  }
}

impl TryFrom<u8> for ReviewQuality {
  type Error = ScheduleError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Self::from_u8(value)
  }
}
