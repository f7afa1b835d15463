//! Practice sessions: composition entry point and the per-item grading
//! state machine.
//!
//! ```text
//! Loaded --reveal--> AnswerRevealed --grade--> Graded --advance--> Loaded
//!                                                 \--(last item)--> Complete
//! any state --end_session--> Complete
//! ```
//!
//! Grading takes `&mut self`, so a session can never have two grades in
//! flight. The item save runs as a spawned task; its failure is reported as
//! a [`PersistenceWarning`] and never blocks the session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::cache::ReviewCache;
use crate::config::{EngineConfig, SESSION_EVENT_CAPACITY};
use crate::db::LogOnError;
use crate::domain::{DailyActivityRecord, ReviewItem, SessionSummary};
use crate::error::{PersistenceWarning, SessionError, StoreError, StoreResult};
use crate::srs::{compose_queue, plan_session, review_item};
use crate::store::ReviewStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  Loaded,
  AnswerRevealed,
  Graded,
  Complete,
}

impl SessionState {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Loaded => "loaded",
      Self::AnswerRevealed => "answer_revealed",
      Self::Graded => "graded",
      Self::Complete => "complete",
    }
  }
}

/// Running statistics for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
  pub graded: i64,
  pub correct: i64,
  pub incorrect: i64,
  /// Never-reviewed items recalled correctly
  pub learned: i64,
}

impl SessionStats {
  pub fn accuracy_percentage(&self) -> f64 {
    if self.graded > 0 {
      self.correct as f64 / self.graded as f64 * 100.0
    } else {
      0.0
    }
  }
}

/// Notifications for the presentation layer
#[derive(Debug, Clone)]
pub enum SessionEvent {
  AnswerRevealed { item_id: String },
  ItemGraded { item_id: String, quality: u8, stats: SessionStats },
  PersistenceWarning(PersistenceWarning),
  Completed(SessionSummary),
}

/// Result of grading one item
#[derive(Debug, Clone)]
pub struct GradeOutcome {
  /// Item state after scheduling
  pub item: ReviewItem,
  /// Set when the background save failed
  pub warning: Option<PersistenceWarning>,
  /// The graded item was the last one and the session is now complete
  pub session_complete: bool,
  /// Writing the completion summary failed; `end_session` retries it
  pub completion_error: Option<String>,
}

impl GradeOutcome {
  pub fn into_result(self) -> Result<(), PersistenceWarning> {
    match self.warning {
      Some(warning) => Err(warning),
      None => Ok(()),
    }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
  pub target_size: usize,
}

impl From<&EngineConfig> for SessionConfig {
  fn from(config: &EngineConfig) -> Self {
    Self {
      target_size: config.session_size,
    }
  }
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self::from(&EngineConfig::default())
  }
}

pub enum SessionStart {
  Ready(StudySession),
  /// Nothing due and nothing new; not an error
  NoCardsAvailable,
}

/// Builds sessions for one learner
#[derive(Clone)]
pub struct SessionComposer {
  cache: Arc<ReviewCache>,
}

impl SessionComposer {
  pub fn new(store: Arc<dyn ReviewStore>, config: &EngineConfig) -> Self {
    Self {
      cache: Arc::new(ReviewCache::new(store, config.cache_ttl())),
    }
  }

  pub fn with_cache(cache: Arc<ReviewCache>) -> Self {
    Self { cache }
  }

  pub fn cache(&self) -> &Arc<ReviewCache> {
    &self.cache
  }

  pub async fn start_session(&self, config: SessionConfig) -> StoreResult<SessionStart> {
    let now = Utc::now();
    let plan = plan_session(config.target_size);

    match compose_queue(&self.cache, plan, now).await? {
      Some(queue) => {
        let session = StudySession::new(self.cache.clone(), queue.items, now);
        tracing::info!(
          session_id = %session.id(),
          items = session.len(),
          new_items = queue.new_count,
          "session started"
        );
        Ok(SessionStart::Ready(session))
      }
      None => {
        tracing::info!("no cards available for a session");
        Ok(SessionStart::NoCardsAvailable)
      }
    }
  }
}

pub struct StudySession {
  id: Uuid,
  started_at: DateTime<Utc>,
  queue: Vec<ReviewItem>,
  position: usize,
  state: SessionState,
  stats: SessionStats,
  cache: Arc<ReviewCache>,
  events: broadcast::Sender<SessionEvent>,
  /// Summary computed at completion; kept so retries write the same row
  summary: Option<SessionSummary>,
  summary_written: bool,
}

impl StudySession {
  fn new(cache: Arc<ReviewCache>, queue: Vec<ReviewItem>, started_at: DateTime<Utc>) -> Self {
    let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
    Self {
      id: Uuid::new_v4(),
      started_at,
      queue,
      position: 0,
      state: SessionState::Loaded,
      stats: SessionStats::default(),
      cache,
      events,
      summary: None,
      summary_written: false,
    }
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn started_at(&self) -> DateTime<Utc> {
    self.started_at
  }

  pub fn state(&self) -> SessionState {
    self.state
  }

  pub fn stats(&self) -> SessionStats {
    self.stats
  }

  pub fn len(&self) -> usize {
    self.queue.len()
  }

  pub fn is_empty(&self) -> bool {
    self.queue.is_empty()
  }

  /// Zero-based index of the current item
  pub fn position(&self) -> usize {
    self.position
  }

  /// Item on screen, `None` once the session is complete
  pub fn current(&self) -> Option<&ReviewItem> {
    if self.state == SessionState::Complete {
      None
    } else {
      self.queue.get(self.position)
    }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
    self.events.subscribe()
  }

  fn invalid(&self, action: &'static str) -> SessionError {
    SessionError::InvalidTransition {
      action,
      state: self.state.as_str(),
    }
  }

  fn emit(&self, event: SessionEvent) {
    // No subscribers is fine
    let _ = self.events.send(event);
  }

  pub fn reveal_answer(&mut self) -> Result<&ReviewItem, SessionError> {
    if self.state != SessionState::Loaded || self.position >= self.queue.len() {
      return Err(self.invalid("reveal answer"));
    }
    self.state = SessionState::AnswerRevealed;
    self.emit(SessionEvent::AnswerRevealed {
      item_id: self.queue[self.position].id.clone(),
    });
    Ok(&self.queue[self.position])
  }

  /// Grade the revealed item.
  ///
  /// The grade is applied and the session is in `Graded` before the save is
  /// awaited. If this future is dropped the spawned save keeps running and
  /// the session stays in `Graded`; on the last item `advance` then returns
  /// `None` and `end_session` completes it.
  ///
  /// Once the grade is applied this returns `Ok`. A failed save or summary
  /// write is reported inside the outcome.
  pub async fn grade_current(&mut self, quality: u8) -> Result<GradeOutcome, SessionError> {
    if self.state != SessionState::AnswerRevealed {
      return Err(self.invalid("grade"));
    }

    let now = Utc::now();
    let Some(before) = self.queue.get(self.position) else {
      return Err(self.invalid("grade"));
    };
    let updated = review_item(before, quality, now)?;

    self.stats.graded += 1;
    if updated.times_correct > before.times_correct {
      self.stats.correct += 1;
      if before.is_new() {
        self.stats.learned += 1;
      }
    } else {
      self.stats.incorrect += 1;
    }
    self.queue[self.position] = updated.clone();
    self.state = SessionState::Graded;

    let handle = self.dispatch_save(updated.clone());

    self.emit(SessionEvent::ItemGraded {
      item_id: updated.id.clone(),
      quality,
      stats: self.stats,
    });

    let warning = match handle.await {
      Ok(Ok(())) => None,
      Ok(Err(e)) => Some(e.to_string()),
      Err(e) => Some(StoreError::Task(e.to_string()).to_string()),
    }
    .map(|message| PersistenceWarning {
      item_id: updated.id.clone(),
      message,
    });

    if let Some(warning) = &warning {
      tracing::warn!(session_id = %self.id, "{}", warning);
      self.emit(SessionEvent::PersistenceWarning(warning.clone()));
    }

    let session_complete = self.position + 1 >= self.queue.len();
    let completion_error = if session_complete {
      match self.finish().await {
        Ok(_) => None,
        Err(e) => {
          tracing::warn!(session_id = %self.id, "Failed to record session completion: {}", e);
          Some(e.to_string())
        }
      }
    } else {
      None
    };

    Ok(GradeOutcome {
      item: updated,
      warning,
      session_complete,
      completion_error,
    })
  }

  fn dispatch_save(&self, item: ReviewItem) -> JoinHandle<StoreResult<()>> {
    let cache = self.cache.clone();
    tokio::spawn(async move {
      let result = cache.store().upsert_item(&item).await;
      cache.invalidate_all().await;
      result
    })
  }

  /// Move past a graded item. Returns the next item, or `None` when there is
  /// none left.
  pub fn advance(&mut self) -> Result<Option<&ReviewItem>, SessionError> {
    match self.state {
      SessionState::Complete => Ok(None),
      // Last item graded but completion never ran; stay put for end_session
      SessionState::Graded if self.position + 1 >= self.queue.len() => Ok(None),
      SessionState::Graded => {
        self.position += 1;
        self.state = SessionState::Loaded;
        Ok(self.queue.get(self.position))
      }
      _ => Err(self.invalid("advance")),
    }
  }

  /// End the session now, from any state.
  ///
  /// Safe to call repeatedly: the summary is written once and later calls
  /// return it without writing again.
  pub async fn end_session(&mut self) -> Result<SessionSummary, SessionError> {
    if self.summary_written {
      if let Some(summary) = &self.summary {
        return Ok(summary.clone());
      }
    }

    self.finish().await
  }

  async fn finish(&mut self) -> Result<SessionSummary, SessionError> {
    self.state = SessionState::Complete;
    let aborted = (self.stats.graded as usize) < self.queue.len();

    let summary = if let Some(summary) = self.summary.clone() {
      summary
    } else {
      let ended_at = Utc::now();
      let remaining_due = self.cache.due_count(ended_at).await?;
      let summary = SessionSummary {
        session_id: self.id,
        started_at: self.started_at,
        ended_at,
        elapsed_secs: (ended_at - self.started_at).num_seconds().max(0),
        items_queued: self.queue.len() as i64,
        items_graded: self.stats.graded,
        correct: self.stats.correct,
        incorrect: self.stats.incorrect,
        items_learned: self.stats.learned,
        remaining_due,
        aborted,
      };
      self.summary = Some(summary.clone());
      summary
    };

    let store = self.cache.store();
    store.upsert_session(&summary).await?;
    self.summary_written = true;

    record_activity(store.as_ref(), &summary)
      .await
      .log_warn("Failed to record daily activity");

    tracing::info!(
      session_id = %self.id,
      graded = summary.items_graded,
      accuracy = summary.accuracy_percentage(),
      aborted = summary.aborted,
      "session complete"
    );
    self.emit(SessionEvent::Completed(summary.clone()));

    Ok(summary)
  }
}

/// Fold a finished session into today's activity record
pub async fn record_activity(store: &dyn ReviewStore, summary: &SessionSummary) -> StoreResult<()> {
  if summary.items_graded == 0 {
    return Ok(());
  }

  let today = summary.ended_at.date_naive();
  let mut record = store
    .fetch_activity(today..=today)
    .await?
    .into_iter()
    .next()
    .unwrap_or_else(|| DailyActivityRecord::empty(today));

  record.absorb(
    summary.elapsed_minutes(),
    summary.items_graded,
    summary.items_learned,
    summary.correct,
  );
  store.upsert_activity(&record).await
}
