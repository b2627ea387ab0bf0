//! SQLite connection pool configuration

use std::time::Duration;

use crate::storage::config::StorageConfig;

/// SQLite pool configuration
///
/// Wraps [`StorageConfig`] with r2d2-specific settings
#[derive(Debug, Clone)]
pub struct SqlitePoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,

    /// Connection timeout
    pub connection_timeout: Duration,

    /// Busy timeout for SQLite operations
    pub busy_timeout: Duration,

    /// Enable WAL journal mode
    pub enable_wal: bool,

    /// Enable foreign key constraints
    pub enable_foreign_keys: bool,
}

impl From<&StorageConfig> for SqlitePoolConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            max_size: config.pool_size,
            connection_timeout: Duration::from_secs(config.connection_timeout_secs),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
            enable_wal: config.enable_wal,
            enable_foreign_keys: config.enable_foreign_keys,
        }
    }
}

impl Default for SqlitePoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5000),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_from_storage_config() {
        let storage_config = StorageConfig {
            path: PathBuf::from("steeple-test.db"),
            pool_size: 20,
            connection_timeout_secs: 10,
            busy_timeout_ms: 10000,
            enable_wal: false,
            enable_foreign_keys: false,
        };

        let pool_config = SqlitePoolConfig::from(&storage_config);

        assert_eq!(pool_config.max_size, 20);
        assert_eq!(pool_config.connection_timeout, Duration::from_secs(10));
        assert_eq!(pool_config.busy_timeout, Duration::from_millis(10000));
        assert!(!pool_config.enable_wal);
        assert!(!pool_config.enable_foreign_keys);
    }
}
