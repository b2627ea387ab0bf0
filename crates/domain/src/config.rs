//! Configuration structures
//!
//! Every section has serde defaults so a config file only needs the values
//! it overrides.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BIND_ADDR, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DB_PATH, DEFAULT_EVENT_STALENESS_SECS,
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MIN_OCCURRENCES, DEFAULT_PATTERN_STALENESS_SECS,
    DEFAULT_TIMEZONE, DEFAULT_WINDOW_MONTHS, GOOGLE_CALENDAR_API_BASE, GOOGLE_TOKEN_URL,
};
use crate::errors::{Result, SteepleError};

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub calendar: CalendarConfig,
    pub cache: CacheConfig,
    pub analyzer: AnalyzerConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Check cross-field constraints the type system cannot express.
    ///
    /// # Errors
    /// Returns [`SteepleError::Config`] naming the first offending value.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(SteepleError::Config("database.path must not be empty".into()));
        }
        if self.database.pool_size == 0 {
            return Err(SteepleError::Config("database.pool_size must be at least 1".into()));
        }
        if self.calendar.window_months == 0 {
            return Err(SteepleError::Config("calendar.window_months must be at least 1".into()));
        }
        if self.calendar.fetch_timeout_secs == 0 {
            return Err(SteepleError::Config("calendar.fetch_timeout_secs must be positive".into()));
        }
        if self.analyzer.min_occurrences < 2 {
            return Err(SteepleError::Config("analyzer.min_occurrences must be at least 2".into()));
        }
        if !(0.0..1.0).contains(&self.analyzer.confidence_threshold) {
            return Err(SteepleError::Config(format!(
                "analyzer.confidence_threshold must be in [0, 1), got {}",
                self.analyzer.confidence_threshold
            )));
        }
        if self.calendar.provider == CalendarProviderKind::Seed && self.calendar.seed_file.is_none()
        {
            return Err(SteepleError::Config(
                "calendar.seed_file is required when provider = \"seed\"".into(),
            ));
        }
        Ok(())
    }
}

/// SQLite database settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: DEFAULT_DB_PATH.to_string(), pool_size: 8, busy_timeout_ms: 5000 }
    }
}

/// Which adapter feeds the event cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarProviderKind {
    #[default]
    Google,
    Seed,
}

/// Calendar provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub provider: CalendarProviderKind,
    pub calendar_id: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub api_base_url: String,
    pub token_url: String,
    pub seed_file: Option<String>,
    /// Organisation timezone; all day-of-week and HH:MM values are local to it.
    pub timezone: Tz,
    pub fetch_timeout_secs: u64,
    pub window_months: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            provider: CalendarProviderKind::Google,
            calendar_id: "primary".to_string(),
            client_id: None,
            client_secret: None,
            refresh_token: None,
            api_base_url: GOOGLE_CALENDAR_API_BASE.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            seed_file: None,
            timezone: DEFAULT_TIMEZONE,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            window_months: DEFAULT_WINDOW_MONTHS,
        }
    }
}

/// Staleness windows for both caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub event_staleness_secs: u64,
    pub pattern_staleness_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            event_staleness_secs: DEFAULT_EVENT_STALENESS_SECS,
            pattern_staleness_secs: DEFAULT_PATTERN_STALENESS_SECS,
        }
    }
}

/// Recurring pattern analyzer tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Buckets smaller than this never produce a pattern.
    pub min_occurrences: usize,
    /// Exclusive lower bound on confidence.
    pub confidence_threshold: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_occurrences: DEFAULT_MIN_OCCURRENCES,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: DEFAULT_BIND_ADDR.to_string(), log_json: false }
    }
}
