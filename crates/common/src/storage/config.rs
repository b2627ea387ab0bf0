//! Storage configuration
//!
//! Connection pool settings and SQLite pragmas for the storage layer.

use std::path::PathBuf;
use std::time::Duration;

use super::error::{StorageError, StorageResult};

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Database file path
    pub path: PathBuf,

    /// Connection pool size (default: 10)
    pub pool_size: u32,

    /// Connection timeout in seconds (default: 5)
    pub connection_timeout_secs: u64,

    /// Busy timeout in milliseconds (default: 5000)
    pub busy_timeout_ms: u64,

    /// Enable WAL mode (default: true)
    pub enable_wal: bool,

    /// Enable foreign keys (default: true)
    pub enable_foreign_keys: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/steeple.db"),
            pool_size: 10,
            connection_timeout_secs: 5,
            busy_timeout_ms: 5000,
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

impl StorageConfig {
    /// Create a new configuration with the given path
    pub fn new(path: PathBuf) -> Self {
        Self { path, ..Default::default() }
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidConfig`] if any value is out of range.
    pub fn validate(&self) -> StorageResult<()> {
        if self.pool_size == 0 {
            return Err(StorageError::InvalidConfig(
                "pool_size must be greater than 0".to_string(),
            ));
        }
        if self.pool_size > 100 {
            return Err(StorageError::InvalidConfig("pool_size too large (max: 100)".to_string()));
        }
        if self.connection_timeout_secs == 0 {
            return Err(StorageError::InvalidConfig(
                "connection_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.path.as_os_str().is_empty() {
            return Err(StorageError::InvalidConfig("database path cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Set the connection pool size
    #[must_use]
    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Set the busy timeout
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}
