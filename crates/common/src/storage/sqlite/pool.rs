//! SQLite connection pool
//!
//! r2d2-based pooling with per-connection pragmas and acquisition metrics.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::config::SqlitePoolConfig;
use super::connection::SqliteConnection;
use super::pragmas::apply_connection_pragmas;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::metrics::StorageMetrics;
use crate::storage::types::{HealthStatus, PoolMetrics};

/// SQLite connection pool
#[derive(Debug)]
pub struct SqlitePool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlitePoolConfig,
    metrics: Arc<StorageMetrics>,
}

impl SqlitePool {
    /// Open (or create) the database file and build the pool
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or the pool cannot hand
    /// out a first connection.
    #[instrument(fields(db_path = ?path, pool_size = config.max_size))]
    pub fn new(path: &Path, config: SqlitePoolConfig) -> StorageResult<Self> {
        let manager = SqliteConnectionManager::file(path);
        Self::build(manager, config)
    }

    /// Shared-cache in-memory database, useful for tests
    ///
    /// # Errors
    /// Returns an error if the pool cannot be created.
    pub fn in_memory(name: &str, config: SqlitePoolConfig) -> StorageResult<Self> {
        let uri = format!("file:{name}?mode=memory&cache=shared");
        let manager = SqliteConnectionManager::file(uri).with_flags(
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        );
        Self::build(manager, SqlitePoolConfig { enable_wal: false, ..config })
    }

    fn build(manager: SqliteConnectionManager, config: SqlitePoolConfig) -> StorageResult<Self> {
        info!("Creating SQLite connection pool");

        let metrics = Arc::new(StorageMetrics::new(config.max_size));
        let pragma_config = config.clone();
        let manager = manager.with_init(move |conn| {
            apply_connection_pragmas(conn, &pragma_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!(error = %e, "failed to create connection pool");
                StorageError::Connection(format!("Failed to create pool: {e}"))
            })?;

        info!(max_size = config.max_size, "SQLite pool created");

        Ok(Self { pool, config, metrics })
    }

    /// Acquire a connection from the pool
    ///
    /// # Errors
    /// Returns [`StorageError::Timeout`] when the pool stays exhausted for the
    /// configured timeout, [`StorageError::Connection`] otherwise.
    pub fn get_connection(&self) -> StorageResult<SqliteConnection> {
        let start = Instant::now();

        match self.pool.get() {
            Ok(conn) => {
                let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                self.metrics.record_connection_acquired(duration_ms);
                debug!(duration_ms, "connection acquired");
                Ok(SqliteConnection::new(conn))
            }
            Err(e) => {
                let err_str = e.to_string().to_lowercase();
                if err_str.contains("timed out") || err_str.contains("timeout") {
                    self.metrics.record_connection_timeout();
                    warn!(timeout = ?self.config.connection_timeout, "connection timeout");
                    Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
                } else {
                    self.metrics.record_connection_error();
                    warn!(error = %e, "connection error");
                    Err(StorageError::Connection(format!("Failed to get connection: {e}")))
                }
            }
        }
    }

    /// Report pool state
    pub fn health_check(&self) -> HealthStatus {
        let state = self.pool.state();
        match self.pool.get() {
            Ok(_conn) => HealthStatus::healthy(
                state.connections as usize,
                state.idle_connections as usize,
                self.config.max_size as usize,
            ),
            Err(e) => HealthStatus::unhealthy(format!("Pool unhealthy: {e}")),
        }
    }

    /// Current pool counters
    pub fn metrics(&self) -> PoolMetrics {
        self.metrics.snapshot()
    }

    /// Configured maximum pool size
    pub fn max_size(&self) -> u32 {
        self.config.max_size
    }
}
