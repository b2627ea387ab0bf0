//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use steeple_common::storage::StorageError;
use steeple_domain::SteepleError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SteepleError);

impl From<InfraError> for SteepleError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SteepleError> for InfraError {
    fn from(value: SteepleError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoSteepleError {
    fn into_steeple(self) -> SteepleError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → SteepleError */
/* -------------------------------------------------------------------------- */

impl IntoSteepleError for SqlError {
    fn into_steeple(self) -> SteepleError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        SteepleError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        SteepleError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        SteepleError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        SteepleError::Database("foreign key constraint violation".into())
                    }
                    _ => SteepleError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => SteepleError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                SteepleError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                SteepleError::Database(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => SteepleError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => SteepleError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_steeple())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → SteepleError */
/* -------------------------------------------------------------------------- */

impl IntoSteepleError for StorageError {
    fn into_steeple(self) -> SteepleError {
        match self {
            StorageError::Rusqlite(err) => err.into_steeple(),
            StorageError::Timeout(secs) => SteepleError::Database(format!(
                "timed out after {secs}s waiting for a database connection"
            )),
            StorageError::InvalidConfig(message) => SteepleError::Config(message),
            other => SteepleError::Database(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_steeple())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SteepleError */
/* -------------------------------------------------------------------------- */

impl IntoSteepleError for HttpError {
    fn into_steeple(self) -> SteepleError {
        if self.is_timeout() {
            return SteepleError::UpstreamUnavailable("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SteepleError::UpstreamUnavailable("HTTP connection failure".into());
        }

        if self.is_decode() {
            return SteepleError::UpstreamMalformed(format!("undecodable response body: {self}"));
        }

        if let Some(status) = self.status() {
            return SteepleError::UpstreamUnavailable(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            ));
        }

        SteepleError::UpstreamUnavailable(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_steeple())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → SteepleError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(SteepleError::Internal(format!("json encoding failed: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Blocking task join failures */
/* -------------------------------------------------------------------------- */

impl From<tokio::task::JoinError> for InfraError {
    fn from(value: tokio::task::JoinError) -> Self {
        InfraError(SteepleError::Internal(format!("blocking task failed: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
