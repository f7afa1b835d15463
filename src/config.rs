//! Engine configuration and tuning constants.
//!
//! Tunables are read from `config.toml` first, then from the environment
//! (a `.env` file is honoured), then fall back to the defaults below.

use serde::Deserialize;
use std::path::PathBuf;

// ==================== SM-2 Constants ====================

/// Ease factor floor; an item never gets harder to schedule than this
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor assigned to freshly authored items
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Interval (days) after the second successful review
pub const GRADUATION_INTERVAL_DAYS: i64 = 6;

/// Longest interval the scheduler hands out (100 years)
pub const MAX_INTERVAL_DAYS: i64 = 36_500;

/// Lowest quality that still counts as a correct recall
pub const PASSING_QUALITY: u8 = 3;

// ==================== Session Composition ====================

/// Default number of items in one practice session
pub const DEFAULT_SESSION_SIZE: usize = 30;

/// Hard ceiling on new items per session (short-term memory load)
pub const NEW_ITEM_CEILING: usize = 7;

// ==================== Cache ====================

/// Default lifetime of a cached review query, in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;

// ==================== Engagement ====================

/// Trailing window (calendar days, today included) used for tier classification
pub const ENGAGEMENT_WINDOW_DAYS: i64 = 7;

/// Minimum active days in the window for the HIGH tier
pub const HIGH_TIER_MIN_ACTIVE_DAYS: usize = 5;

/// Minimum active days in the window for the MEDIUM tier
pub const MEDIUM_TIER_MIN_ACTIVE_DAYS: usize = 2;

/// Default step a recorded click moves the click-through rate toward 1.0
pub const DEFAULT_CLICK_RATE_STEP: f64 = 0.05;

/// Default delay between notifier passes, in seconds
pub const DEFAULT_NOTIFY_INTERVAL_SECS: u64 = 3600;

/// Broadcast buffer for session events
pub const SESSION_EVENT_CAPACITY: usize = 64;

// ==================== Loaded Configuration ====================

/// Configuration file structure for config.toml
#[derive(Debug, Deserialize)]
struct ConfigFile {
    engine: Option<EngineConfig>,
}

/// Runtime tunables for the scheduling and engagement engine
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Target number of items per practice session
    pub session_size: usize,
    /// Lifetime of cached due/new/count queries
    pub cache_ttl_secs: u64,
    /// Click-through rate step applied on each recorded click
    pub click_rate_step: f64,
    /// Delay between notifier passes
    pub notify_interval_secs: u64,
    /// Base data directory (overrides DATA_DIR when set)
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_size: DEFAULT_SESSION_SIZE,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            click_rate_step: DEFAULT_CLICK_RATE_STEP,
            notify_interval_secs: DEFAULT_NOTIFY_INTERVAL_SECS,
            data_dir: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration with priority: config.toml > .env/environment > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        if let Ok(contents) = std::fs::read_to_string("config.toml") {
            match Self::from_toml(&contents) {
                Some(config) => {
                    tracing::info!("Using engine configuration from config.toml");
                    return config;
                }
                None => tracing::debug!("config.toml has no [engine] table"),
            }
        }

        Self::from_env()
    }

    /// Parse the `[engine]` table of a config.toml document
    pub fn from_toml(contents: &str) -> Option<Self> {
        match toml::from_str::<ConfigFile>(contents) {
            Ok(file) => file.engine,
            Err(e) => {
                tracing::warn!("Ignoring malformed config.toml: {}", e);
                None
            }
        }
    }

    /// Build configuration from environment variables, defaulting anything unset
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(size) = env_parse::<usize>("LINGO_SESSION_SIZE") {
            config.session_size = size;
        }
        if let Some(ttl) = env_parse::<u64>("LINGO_CACHE_TTL_SECS") {
            config.cache_ttl_secs = ttl;
        }
        if let Some(step) = env_parse::<f64>("LINGO_CLICK_RATE_STEP") {
            config.click_rate_step = step;
        }
        if let Some(interval) = env_parse::<u64>("LINGO_NOTIFY_INTERVAL_SECS") {
            config.notify_interval_secs = interval;
        }

        config
    }

    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn notify_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.notify_interval_secs.max(1))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {}={}", key, raw);
            None
        }
    }
}
