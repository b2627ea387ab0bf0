//! Event cache refresh log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_label_conversions;

/// Why a refresh ran. All kinds share one code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshKind {
    /// Snapshot was missing or stale on read
    Scheduled,
    /// Operator asked for it
    Manual,
    /// Caller passed `forceRefresh`
    Force,
}

impl_label_conversions!(RefreshKind {
    Scheduled => "scheduled",
    Manual => "manual",
    Force => "force",
});

/// Where the events served after a refresh came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshSource {
    ProviderApi,
    StaleFallback,
    SeedData,
}

impl_label_conversions!(RefreshSource {
    ProviderApi => "provider_api",
    StaleFallback => "stale_fallback",
    SeedData => "seed_data",
});

/// Append-only refresh log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRefreshRecord {
    pub id: String,
    pub refresh_kind: RefreshKind,
    pub event_count: i64,
    pub succeeded: bool,
    pub error_message: Option<String>,
    pub duration_ms: i64,
    pub source: RefreshSource,
    pub refreshed_at: DateTime<Utc>,
}

impl CacheRefreshRecord {
    #[must_use]
    pub fn success(
        refresh_kind: RefreshKind,
        source: RefreshSource,
        event_count: usize,
        duration_ms: i64,
        refreshed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            refresh_kind,
            event_count: i64::try_from(event_count).unwrap_or(i64::MAX),
            succeeded: true,
            error_message: None,
            duration_ms,
            source,
            refreshed_at,
        }
    }

    /// Failed refresh; `event_count` is the size of the stale snapshot served
    /// instead.
    #[must_use]
    pub fn fallback(
        refresh_kind: RefreshKind,
        error_message: impl Into<String>,
        event_count: usize,
        duration_ms: i64,
        refreshed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            refresh_kind,
            event_count: i64::try_from(event_count).unwrap_or(i64::MAX),
            succeeded: false,
            error_message: Some(error_message.into()),
            duration_ms,
            source: RefreshSource::StaleFallback,
            refreshed_at,
        }
    }
}
