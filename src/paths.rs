//! Data directory layout - single source of truth for database locations.
//!
//! ```text
//! <data_dir>/app.db                      shared notification-template catalog
//! <data_dir>/users/<learner>/learning.db per-learner review items, sessions, activity
//! ```
//!
//! ## Environment Variables
//!
//! - `DATA_DIR`: Override the base data directory (default: "data")

use std::env;
use std::path::{Path, PathBuf};

/// Default base data directory when neither config nor DATA_DIR set one
pub const DEFAULT_DATA_DIR: &str = "data";

/// Resolve the base data directory (explicit override > DATA_DIR env > default)
pub fn data_dir(override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    env::var("DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Database locations rooted at one data directory
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shared catalog database path
    pub fn catalog_db_path(&self) -> PathBuf {
        self.root.join("app.db")
    }

    /// Directory holding one subdirectory per learner
    pub fn users_dir(&self) -> PathBuf {
        self.root.join("users")
    }

    /// Learner's learning database path
    pub fn learner_db_path(&self, learner: &str) -> PathBuf {
        self.users_dir().join(learner).join("learning.db")
    }

    /// Learners that have a learning database on disk, sorted by name
    pub fn learners(&self) -> std::io::Result<Vec<String>> {
        let dir = self.users_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut learners = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.learner_db_path(&name).exists() {
                learners.push(name);
            }
        }
        learners.sort();
        Ok(learners)
    }
}

// ==================== Tests ====================
