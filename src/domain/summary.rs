use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted record of one finished (or aborted) practice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
  pub session_id: Uuid,
  pub started_at: DateTime<Utc>,
  pub ended_at: DateTime<Utc>,
  pub elapsed_secs: i64,
  /// Items queued when the session was composed
  pub items_queued: i64,
  pub items_graded: i64,
  pub correct: i64,
  pub incorrect: i64,
  /// Never-reviewed items that were recalled correctly this session
  pub items_learned: i64,
  /// Due items left in the store when the session ended
  pub remaining_due: i64,
  /// Ended by the learner before the queue ran out
  pub aborted: bool,
}

impl SessionSummary {
  /// Percentage of graded items recalled correctly
  pub fn accuracy_percentage(&self) -> f64 {
    if self.items_graded > 0 {
      self.correct as f64 / self.items_graded as f64 * 100.0
    } else {
      0.0
    }
  }

  /// Elapsed time in whole minutes, rounded up
  pub fn elapsed_minutes(&self) -> i64 {
    (self.elapsed_secs.max(0) + 59) / 60
  }
}
