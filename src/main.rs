use std::sync::Arc;

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lingo_srs::config::EngineConfig;
use lingo_srs::db::SqliteStore;
use lingo_srs::engagement::NotificationSelector;
use lingo_srs::paths::{self, DataLayout};
use lingo_srs::push::{LogPush, NotificationDispatcher, NotifyOutcome};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "lingo_srs=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = EngineConfig::load();
  let layout = DataLayout::new(paths::data_dir(config.data_dir.as_deref()));
  tracing::info!("Using data directory {}", layout.root().display());

  let catalog = SqliteStore::open_catalog(&layout.catalog_db_path())?;
  let selector = NotificationSelector::new(Arc::new(catalog), &config);
  let dispatcher = NotificationDispatcher::new(selector, Box::new(LogPush));

  let mut ticker = tokio::time::interval(config.notify_interval());
  loop {
    tokio::select! {
      _ = ticker.tick() => run_pass(&dispatcher, &layout).await,
      _ = tokio::signal::ctrl_c() => {
        tracing::info!("Shutting down notifier");
        break;
      }
    }
  }

  Ok(())
}

/// Notify every learner under the data directory once
async fn run_pass(dispatcher: &NotificationDispatcher, layout: &DataLayout) {
  let learners = match layout.learners() {
    Ok(learners) => learners,
    Err(e) => {
      tracing::warn!("Could not list learners in {}: {}", layout.users_dir().display(), e);
      return;
    }
  };

  let now = Utc::now();
  let mut sent = 0;
  for learner in &learners {
    let store = match SqliteStore::open_learner(&layout.learner_db_path(learner)) {
      Ok(store) => store,
      Err(e) => {
        tracing::warn!(learner = %learner, "Could not open learning database: {}", e);
        continue;
      }
    };

    match dispatcher.notify_learner(learner, &store, now).await {
      Ok(NotifyOutcome::Sent(_)) => sent += 1,
      Ok(_) => {}
      Err(e) => tracing::warn!(learner = %learner, "Notification failed: {}", e),
    }
  }

  tracing::info!(learners = learners.len(), sent, "Notification pass complete");
}
