//! Storage primitives for SQLite databases
//!
//! This module provides the pooled SQLite connection layer shared by the
//! infrastructure repositories.

pub mod config;
pub mod error;
pub mod metrics;
pub mod sqlite;
pub mod types;

// Re-export commonly used types
pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use metrics::StorageMetrics;
pub use sqlite::{apply_connection_pragmas, SqliteConnection, SqlitePool, SqlitePoolConfig};
pub use types::{HealthStatus, PoolMetrics};
