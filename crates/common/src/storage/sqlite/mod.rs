//! Pooled SQLite connections

mod config;
mod connection;
mod pool;
mod pragmas;

pub use config::SqlitePoolConfig;
pub use connection::SqliteConnection;
pub use pool::SqlitePool;
pub use pragmas::apply_connection_pragmas;
