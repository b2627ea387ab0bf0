//! Database connection manager backed by the shared SQLite pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::params;
use steeple_common::storage::{SqliteConnection, SqlitePool, SqlitePoolConfig};
use steeple_domain::{DatabaseConfig, Result, SteepleError};
use tracing::info;

use crate::errors::InfraError;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Result type for closures that run on the blocking pool.
pub type InfraResult<T> = std::result::Result<T, InfraError>;

/// Database manager that wraps an [`SqlitePool`].
pub struct DbManager {
    pool: SqlitePool,
    path: PathBuf,
}

impl DbManager {
    /// Open the database file, creating parent directories when missing.
    pub fn new<P: AsRef<Path>>(db_path: P, config: &DatabaseConfig) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SteepleError::Database(format!(
                    "cannot create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let pool_config = SqlitePoolConfig {
            max_size: config.pool_size.max(1),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
            ..SqlitePoolConfig::default()
        };

        let pool = SqlitePool::new(&path, pool_config).map_err(InfraError::from)?;

        info!(
            db_path = %path.display(),
            max_connections = pool.max_size(),
            "sqlite pool initialised"
        );

        Ok(Self { pool, path })
    }

    /// Open using the configured path.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::new(&config.path, config)
    }

    /// Borrow the underlying SQLite pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        Ok(self.pool.get_connection().map_err(InfraError::from)?)
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        create_schema(&conn).map_err(SteepleError::from)
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Perform a health check to verify database connectivity.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0))
            .map_err(InfraError::from)?;
        Ok(())
    }

    /// Run `work` against a pooled connection on the blocking thread pool.
    pub async fn run<T, F>(self: &Arc<Self>, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> InfraResult<T> + Send + 'static,
    {
        let db = Arc::clone(self);
        let outcome = tokio::task::spawn_blocking(move || {
            let mut conn = db.pool.get_connection()?;
            work(&mut conn)
        })
        .await
        .map_err(InfraError::from)?;

        outcome.map_err(SteepleError::from)
    }
}

fn create_schema(conn: &SqliteConnection) -> InfraResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, CAST(strftime('%s','now') AS INTEGER))",
        params![SCHEMA_VERSION],
    )?;
    Ok(())
}
