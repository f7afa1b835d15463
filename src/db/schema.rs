use rusqlite::{Connection, Result};

/// Learner database: review items, session history, daily activity
pub fn run_migrations(conn: &Connection) -> Result<()> {
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS review_items (
      id TEXT PRIMARY KEY,
      prompt TEXT NOT NULL,
      answer TEXT NOT NULL,
      metadata TEXT NOT NULL DEFAULT 'null',
      created_at TEXT NOT NULL,
      ease_factor REAL NOT NULL DEFAULT 2.5,
      interval_days INTEGER NOT NULL DEFAULT 1,
      next_due_at TEXT NOT NULL,
      last_reviewed_at TEXT,
      times_reviewed INTEGER NOT NULL DEFAULT 0,
      times_correct INTEGER NOT NULL DEFAULT 0,
      times_incorrect INTEGER NOT NULL DEFAULT 0,
      dirty INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS session_summaries (
      session_id TEXT PRIMARY KEY,
      started_at TEXT NOT NULL,
      ended_at TEXT NOT NULL,
      elapsed_secs INTEGER NOT NULL,
      items_queued INTEGER NOT NULL,
      items_graded INTEGER NOT NULL,
      correct INTEGER NOT NULL,
      incorrect INTEGER NOT NULL,
      items_learned INTEGER NOT NULL,
      remaining_due INTEGER NOT NULL,
      aborted INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS daily_activity (
      date TEXT PRIMARY KEY,
      minutes_studied INTEGER NOT NULL DEFAULT 0,
      items_reviewed INTEGER NOT NULL DEFAULT 0,
      items_learned INTEGER NOT NULL DEFAULT 0,
      accuracy_percentage REAL NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_review_items_due ON review_items(times_reviewed, next_due_at);
    CREATE INDEX IF NOT EXISTS idx_review_items_created ON review_items(times_reviewed, created_at);
    CREATE INDEX IF NOT EXISTS idx_session_summaries_started ON session_summaries(started_at);
    "#,
  )
}

/// Shared catalog database: notification templates
pub fn run_catalog_migrations(conn: &Connection) -> Result<()> {
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS notification_templates (
      id TEXT PRIMARY KEY,
      text TEXT NOT NULL,
      tier TEXT NOT NULL,
      -- JSON maps keyed by tier name
      click_through TEXT NOT NULL DEFAULT '{}',
      impressions TEXT NOT NULL DEFAULT '{}',
      clicks TEXT NOT NULL DEFAULT '{}',
      last_used_at TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_notification_templates_tier ON notification_templates(tier);
    "#,
  )
}
