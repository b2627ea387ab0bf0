//! Calendar event cache service
//!
//! Holds the last successful provider snapshot and replaces it wholesale on
//! refresh. Provider failures never reach the caller: the previous snapshot
//! is served instead and the failure is written to the refresh log.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use steeple_common::time::Clock;
use steeple_domain::{
    dedupe_by_external_id, local_midnight, CacheRefreshRecord, Config, EventSnapshot, Partition,
    RawEvent, RefreshKind, Result, SteepleError,
};
use tracing::{debug, error, info, instrument, warn};

use super::ports::{EventSnapshotRepository, EventSource, RefreshLogRepository};

/// Tunables for [`EventCache`]
#[derive(Debug, Clone, Copy)]
pub struct EventCacheSettings {
    pub timezone: Tz,
    pub staleness: chrono::Duration,
    pub fetch_timeout: Duration,
    /// Months fetched, starting with the current one
    pub window_months: u32,
}

impl EventCacheSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            timezone: config.calendar.timezone,
            staleness: chrono::Duration::seconds(
                i64::try_from(config.cache.event_staleness_secs).unwrap_or(i64::MAX),
            ),
            fetch_timeout: Duration::from_secs(config.calendar.fetch_timeout_secs),
            window_months: config.calendar.window_months,
        }
    }
}

/// Result of one refresh attempt
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// Snapshot now being served: the new one on success, the previous one
    /// (if any) on fallback
    pub snapshot: Option<EventSnapshot>,
    pub record: CacheRefreshRecord,
}

impl RefreshOutcome {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.record.succeeded
    }

    #[must_use]
    pub fn events(&self) -> Vec<RawEvent> {
        self.snapshot.as_ref().map(|s| s.events.clone()).unwrap_or_default()
    }
}

/// Raw event cache
pub struct EventCache {
    source: Arc<dyn EventSource>,
    snapshots: Arc<dyn EventSnapshotRepository>,
    refresh_log: Arc<dyn RefreshLogRepository>,
    clock: Arc<dyn Clock>,
    settings: EventCacheSettings,
}

impl EventCache {
    pub fn new(
        source: Arc<dyn EventSource>,
        snapshots: Arc<dyn EventSnapshotRepository>,
        refresh_log: Arc<dyn RefreshLogRepository>,
        clock: Arc<dyn Clock>,
        settings: EventCacheSettings,
    ) -> Self {
        Self { source, snapshots, refresh_log, clock, settings }
    }

    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.settings.timezone
    }

    /// Fetch window for a refresh starting now: local midnight on the first
    /// of the current month up to (excluding) the first of the month
    /// `window_months` later
    #[must_use]
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let tz = self.settings.timezone;
        let first = Partition::current(self.clock.now(), tz);
        let after = first.span(self.settings.window_months + 1).last().copied().unwrap_or(first);
        (local_midnight(tz, first.first_day()), local_midnight(tz, after.first_day()))
    }

    /// Persisted snapshot, whatever its age
    pub async fn snapshot(&self) -> Result<Option<EventSnapshot>> {
        self.snapshots.load_snapshot().await
    }

    /// Whether a snapshot was refreshed within the staleness window
    #[must_use]
    pub fn is_fresh(&self, snapshot: &EventSnapshot) -> bool {
        self.clock.now() - snapshot.refreshed_at < self.settings.staleness
    }

    /// Fetch from the provider and replace the snapshot.
    ///
    /// Fetch and persistence failures fall back to the previous snapshot and
    /// are recorded with `succeeded = false`. Only a failure to read that
    /// fallback snapshot is returned as an error.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn refresh(&self, kind: RefreshKind) -> Result<RefreshOutcome> {
        let started = Instant::now();
        let (window_start, window_end) = self.window();

        match self.fetch_and_replace(window_start, window_end).await {
            Ok(snapshot) => {
                let record = CacheRefreshRecord::success(
                    kind,
                    self.source.source_kind(),
                    snapshot.events.len(),
                    elapsed_ms(started),
                    snapshot.refreshed_at,
                );
                info!(
                    events = snapshot.events.len(),
                    source = %record.source,
                    duration_ms = record.duration_ms,
                    "Calendar snapshot replaced"
                );
                self.append_record(&record).await;
                Ok(RefreshOutcome { snapshot: Some(snapshot), record })
            }
            Err(err) => {
                warn!(error = %err, error_type = err.label(), "Calendar refresh failed, serving stale snapshot");
                let stale = self.snapshots.load_snapshot().await?;
                let record = CacheRefreshRecord::fallback(
                    kind,
                    err.to_string(),
                    stale.as_ref().map_or(0, |s| s.events.len()),
                    elapsed_ms(started),
                    self.clock.now(),
                );
                self.append_record(&record).await;
                Ok(RefreshOutcome { snapshot: stale, record })
            }
        }
    }

    /// Newest refresh records first
    pub async fn recent_refreshes(&self, limit: usize) -> Result<Vec<CacheRefreshRecord>> {
        self.refresh_log.recent(limit).await
    }

    /// One occurrence from the current snapshot
    pub async fn find_event(&self, external_id: &str) -> Result<Option<RawEvent>> {
        self.snapshots.find_event(external_id).await
    }

    async fn fetch_and_replace(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<EventSnapshot> {
        let fetch = self.source.fetch_events(window_start, window_end);
        let fetched = tokio::time::timeout(self.settings.fetch_timeout, fetch).await.map_err(|_| {
            SteepleError::UpstreamUnavailable(format!(
                "calendar fetch timed out after {}s",
                self.settings.fetch_timeout.as_secs()
            ))
        })??;

        let (mut events, dropped) = dedupe_by_external_id(fetched);
        if dropped > 0 {
            warn!(dropped, "Provider returned duplicate event ids; kept the last of each");
        }
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.external_id.cmp(&b.external_id)));

        let snapshot =
            EventSnapshot { events, window_start, window_end, refreshed_at: self.clock.now() };
        self.snapshots.replace_snapshot(&snapshot).await?;
        debug!(window_start = %window_start, window_end = %window_end, "Snapshot committed");
        Ok(snapshot)
    }

    async fn append_record(&self, record: &CacheRefreshRecord) {
        if let Err(err) = self.refresh_log.append(record).await {
            error!(error = %err, "Failed to append cache refresh record");
        }
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}
