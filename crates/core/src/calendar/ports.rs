//! Port interfaces for the raw event cache
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use steeple_domain::{CacheRefreshRecord, EventSnapshot, RawEvent, RefreshSource, Result};

/// Calendar provider adapter
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch every occurrence starting in `[window_start, window_end)`.
    ///
    /// Malformed occurrences are skipped by the adapter; only whole-call
    /// failures surface as `UpstreamUnavailable` or `UpstreamMalformed`.
    async fn fetch_events(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>>;

    /// Source label recorded on successful refreshes
    fn source_kind(&self) -> RefreshSource;
}

/// Persisted raw event snapshot
#[async_trait]
pub trait EventSnapshotRepository: Send + Sync {
    /// Current snapshot, events ordered by start. `None` before the first
    /// successful refresh.
    async fn load_snapshot(&self) -> Result<Option<EventSnapshot>>;

    /// Replace the whole snapshot. Readers see either the old or the new
    /// snapshot, never a mix.
    async fn replace_snapshot(&self, snapshot: &EventSnapshot) -> Result<()>;

    /// Look up one occurrence in the current snapshot
    async fn find_event(&self, external_id: &str) -> Result<Option<RawEvent>>;
}

/// Append-only refresh log
#[async_trait]
pub trait RefreshLogRepository: Send + Sync {
    async fn append(&self, record: &CacheRefreshRecord) -> Result<()>;

    /// Newest first
    async fn recent(&self, limit: usize) -> Result<Vec<CacheRefreshRecord>>;
}
