//! Error types shared across the engine.

use thiserror::Error;

/// Rejected scheduler input. Raised before any state is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid recall quality {0}: expected 0..=5")]
    InvalidQuality(u8),
}

/// Failures of the persistent-store collaborator
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database unavailable")]
    Lock,

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("store task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A graded item's save failed. Progress in memory stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not persist review of {item_id}: {message}")]
pub struct PersistenceWarning {
    pub item_id: String,
    pub message: String,
}

/// An outbound collaborator (push gateway, copy writer) failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DeliveryError(pub String);

/// Failures of a notification pass for one learner
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("push delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Errors raised by the session state machine
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("cannot {action} while session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
