//! Pooled connection wrapper

use std::ops::{Deref, DerefMut};

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection as RusqliteConnection, Transaction, TransactionBehavior};
use tracing::instrument;

use crate::storage::error::{StorageError, StorageResult};

/// Pooled SQLite connection
///
/// Derefs to [`rusqlite::Connection`]; the connection returns to the pool when
/// dropped.
pub struct SqliteConnection {
    inner: PooledConnection<SqliteConnectionManager>,
}

impl SqliteConnection {
    /// Wrap a pooled connection
    pub fn new(conn: PooledConnection<SqliteConnectionManager>) -> Self {
        Self { inner: conn }
    }

    /// Begin a write transaction that takes the RESERVED lock up front.
    ///
    /// Concurrent writers wait on the busy timeout here instead of failing
    /// with `SQLITE_BUSY` on their first write.
    #[instrument(skip(self))]
    pub fn immediate_transaction(&mut self) -> StorageResult<Transaction<'_>> {
        self.inner
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)
    }
}

impl Deref for SqliteConnection {
    type Target = RusqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for SqliteConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
