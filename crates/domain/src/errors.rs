//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Steeple
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SteepleError {
    /// The calendar provider could not be reached, refused our credentials,
    /// answered with a non-success status, or timed out.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The calendar provider answered with a body we could not decode.
    #[error("Upstream malformed: {0}")]
    UpstreamMalformed(String),

    /// A reconciliation write targeted a partition that has not been
    /// computed yet.
    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    /// A curated write referenced a ministry or special event type that does
    /// not exist.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SteepleError {
    /// Whether the error came from the calendar provider.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_) | Self::UpstreamMalformed(_))
    }

    /// Short machine-readable label, used as a structured log field.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::UpstreamMalformed(_) => "upstream_malformed",
            Self::PatternNotFound(_) => "pattern_not_found",
            Self::InvalidReference(_) => "invalid_reference",
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for Steeple operations
pub type Result<T> = std::result::Result<T, SteepleError>;
