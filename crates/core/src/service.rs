//! Calendar service: the event cache and the pattern cache behind one
//! writer gate
//!
//! Every operation that replaces cached rows (event refresh, partition
//! recompute, curated writes) runs while holding the gate, so a recompute
//! always reads a fully committed event snapshot and two refreshes never
//! interleave. Reads of fresh data do not take the gate. Readers queued on
//! the gate behind a refresh attempt accept that attempt's result, even a
//! fallback, instead of fetching again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use steeple_common::time::Clock;
use steeple_domain::constants::MAX_HISTORY_LIMIT;
use steeple_domain::{
    select_best_match, CacheRefreshRecord, CompositeKeyInput, EventSnapshot, OrphanedOverlay,
    Partition, RawEvent, RefreshKind, Result, SteepleError, StoredPattern,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::calendar::{EventCache, RefreshOutcome};
use crate::patterns::{PartitionSnapshot, PatternCache};

/// Summary of a refresh, as returned to operators
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub record: CacheRefreshRecord,
    pub event_count: usize,
    pub recomputed_partitions: Vec<Partition>,
}

enum Recompute {
    Done(Vec<StoredPattern>),
    NoSnapshot,
    OutsideWindow,
}

/// Facade over both caches
pub struct CalendarService {
    events: EventCache,
    patterns: PatternCache,
    clock: Arc<dyn Clock>,
    writer: Mutex<()>,
    /// Incremented after every provider fetch attempt, under the gate
    refresh_attempts: AtomicU64,
}

impl CalendarService {
    pub fn new(events: EventCache, patterns: PatternCache, clock: Arc<dyn Clock>) -> Self {
        Self {
            events,
            patterns,
            clock,
            writer: Mutex::new(()),
            refresh_attempts: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.events.timezone()
    }

    /// Partition containing today in the organisation timezone
    #[must_use]
    pub fn current_partition(&self) -> Partition {
        Partition::current(self.clock.now(), self.timezone())
    }

    /// Today's date in the organisation timezone
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.timezone()).date_naive()
    }

    pub(crate) const fn event_cache(&self) -> &EventCache {
        &self.events
    }

    pub(crate) const fn pattern_cache(&self) -> &PatternCache {
        &self.patterns
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) async fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Cached events, refreshing first when forced or stale.
    ///
    /// Provider failures are absorbed: the previous snapshot (possibly
    /// empty) is returned. An unforced call that waited out another
    /// caller's refresh serves whatever that refresh left behind.
    #[instrument(skip(self))]
    pub async fn get_events(&self, force_refresh: bool) -> Result<Vec<RawEvent>> {
        if !force_refresh {
            if let Some(snapshot) = self.fresh_snapshot().await? {
                return Ok(snapshot.events);
            }
        }

        let attempts_seen = self.refresh_attempts.load(Ordering::Acquire);
        let _guard = self.write_guard().await;
        if !force_refresh {
            if let Some(snapshot) = self.fresh_snapshot().await? {
                return Ok(snapshot.events);
            }
            if self.refresh_attempted_since(attempts_seen) {
                debug!("Refresh attempted while waiting; serving current snapshot");
                return Ok(self.events.snapshot().await?.map(|s| s.events).unwrap_or_default());
            }
        }

        let kind = if force_refresh { RefreshKind::Force } else { RefreshKind::Scheduled };
        let (outcome, _) = self.refresh_locked(kind).await?;
        Ok(outcome.events())
    }

    /// Refresh unconditionally
    #[instrument(skip(self))]
    pub async fn refresh(&self, kind: RefreshKind) -> Result<RefreshReport> {
        let _guard = self.write_guard().await;
        let (outcome, recomputed_partitions) = self.refresh_locked(kind).await?;
        Ok(RefreshReport {
            event_count: outcome.snapshot.as_ref().map_or(0, |s| s.events.len()),
            record: outcome.record,
            recomputed_partitions,
        })
    }

    /// Newest refresh records first
    pub async fn recent_refreshes(&self, limit: usize) -> Result<Vec<CacheRefreshRecord>> {
        self.events.recent_refreshes(limit.clamp(1, MAX_HISTORY_LIMIT)).await
    }

    /// A month's patterns. Missing or stale partitions are recomputed first;
    /// when that fails the stale rows are served.
    #[instrument(skip(self))]
    pub async fn get_patterns(
        &self,
        month: u32,
        year: i32,
        include_external: bool,
    ) -> Result<Vec<StoredPattern>> {
        let partition = Partition::new(month, year)?;
        let rows = self.partition_rows(partition).await?;
        Ok(rows.into_iter().filter(|row| include_external || !row.is_external()).collect())
    }

    /// Public patterns featured on the home page that have not ended
    pub async fn featured_patterns(&self, month: u32, year: i32) -> Result<Vec<StoredPattern>> {
        let today = self.today();
        let rows = self.get_patterns(month, year, false).await?;
        Ok(rows.into_iter().filter(|row| row.is_featured_on(today)).collect())
    }

    /// Recompute one partition now
    ///
    /// # Errors
    /// `InvalidInput` when the month lies outside the cached event window,
    /// `UpstreamUnavailable` when no event snapshot exists at all.
    #[instrument(skip(self))]
    pub async fn refresh_partition(&self, month: u32, year: i32) -> Result<Vec<StoredPattern>> {
        let partition = Partition::new(month, year)?;
        let _guard = self.write_guard().await;
        match self.recompute_locked(partition, None).await? {
            Recompute::Done(rows) => Ok(rows),
            Recompute::NoSnapshot => Err(SteepleError::UpstreamUnavailable(
                "no calendar snapshot available; the provider has never been reached".into(),
            )),
            Recompute::OutsideWindow => Err(SteepleError::InvalidInput(format!(
                "{partition} is outside the cached event window"
            ))),
        }
    }

    /// Recompute the current month
    pub async fn refresh_current_partition(&self) -> Result<Vec<StoredPattern>> {
        let partition = self.current_partition();
        self.refresh_partition(partition.month, partition.year).await
    }

    /// Best match for a key in the current month, external rows included
    pub async fn find_by_composite_key(
        &self,
        input: &CompositeKeyInput,
    ) -> Result<Option<StoredPattern>> {
        let key = input.to_key()?;
        let rows = self.partition_rows(self.current_partition()).await?;
        Ok(select_best_match(&key, &rows).cloned())
    }

    /// Newest archived orphans first
    pub async fn orphaned_overlays(&self, limit: usize) -> Result<Vec<OrphanedOverlay>> {
        self.patterns.orphaned(limit.clamp(1, MAX_HISTORY_LIMIT)).await
    }

    fn refresh_attempted_since(&self, attempts_seen: u64) -> bool {
        self.refresh_attempts.load(Ordering::Acquire) != attempts_seen
    }

    async fn fresh_snapshot(&self) -> Result<Option<EventSnapshot>> {
        Ok(self.events.snapshot().await?.filter(|s| self.events.is_fresh(s)))
    }

    async fn partition_rows(&self, partition: Partition) -> Result<Vec<StoredPattern>> {
        match self.patterns.load(partition).await? {
            Some(snapshot) if self.patterns.is_fresh(&snapshot) => Ok(snapshot.rows),
            _ => self.recompute_on_read(partition).await,
        }
    }

    async fn recompute_on_read(&self, partition: Partition) -> Result<Vec<StoredPattern>> {
        let attempts_seen = self.refresh_attempts.load(Ordering::Acquire);
        let _guard = self.write_guard().await;
        let cached: Option<PartitionSnapshot> = match self.patterns.load(partition).await? {
            Some(snapshot) if self.patterns.is_fresh(&snapshot) => return Ok(snapshot.rows),
            other => other,
        };

        match self.recompute_locked(partition, Some(attempts_seen)).await {
            Ok(Recompute::Done(rows)) => Ok(rows),
            Ok(Recompute::NoSnapshot | Recompute::OutsideWindow) => {
                debug!(partition = %partition, "Partition not covered by event snapshot; serving cached rows");
                Ok(cached.map(|s| s.rows).unwrap_or_default())
            }
            Err(err) => match cached {
                Some(stale) => {
                    warn!(partition = %partition, error = %err, "Recompute failed, serving stale patterns");
                    Ok(stale.rows)
                }
                None => Err(err),
            },
        }
    }

    /// `attempts_seen` is the attempt counter read before the gate was
    /// taken; a stale snapshot is used as is when an attempt happened since.
    async fn recompute_locked(
        &self,
        partition: Partition,
        attempts_seen: Option<u64>,
    ) -> Result<Recompute> {
        let tz = self.timezone();
        let current = self.events.snapshot().await?;
        let usable = current.as_ref().is_some_and(|s| self.events.is_fresh(s))
            || attempts_seen.is_some_and(|seen| self.refresh_attempted_since(seen));
        let snapshot = if usable {
            current
        } else {
            let (outcome, recomputed) = self.refresh_locked(RefreshKind::Scheduled).await?;
            if recomputed.contains(&partition) {
                if let Some(done) = self.patterns.load(partition).await? {
                    return Ok(Recompute::Done(done.rows));
                }
            }
            outcome.snapshot
        };

        match snapshot {
            None => Ok(Recompute::NoSnapshot),
            Some(snapshot) if !snapshot.covers(partition, tz) => Ok(Recompute::OutsideWindow),
            Some(snapshot) => {
                Ok(Recompute::Done(self.patterns.recompute(partition, &snapshot).await?))
            }
        }
    }

    /// Refresh the event snapshot, then recompute every partition in the new
    /// window. Returns the partitions that were recomputed.
    async fn refresh_locked(&self, kind: RefreshKind) -> Result<(RefreshOutcome, Vec<Partition>)> {
        let outcome = self.events.refresh(kind).await;
        self.refresh_attempts.fetch_add(1, Ordering::Release);
        let outcome = outcome?;
        let mut recomputed = Vec::new();
        if !outcome.succeeded() {
            return Ok((outcome, recomputed));
        }

        if let Some(snapshot) = &outcome.snapshot {
            let tz = self.timezone();
            let first = Partition::current(snapshot.window_start, tz);
            let partitions = std::iter::successors(Some(first), |p| Some(p.next()))
                .take_while(|p| p.window(tz).0 < snapshot.window_end);
            for partition in partitions {
                match self.patterns.recompute(partition, snapshot).await {
                    Ok(_) => recomputed.push(partition),
                    Err(err) => {
                        warn!(partition = %partition, error = %err, "Partition recompute after refresh failed");
                    }
                }
            }
            info!(partitions = recomputed.len(), "Patterns recomputed after refresh");
        }
        Ok((outcome, recomputed))
    }
}
