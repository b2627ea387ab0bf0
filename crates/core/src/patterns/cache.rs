//! Recurring pattern cache service
//!
//! Patterns are cached per (month, year). A recompute analyzes the month's
//! events, carries curated overlays over from the previous rows by composite
//! key and swaps the partition in one step. Curated data whose key is no
//! longer emitted is archived, not dropped.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use steeple_common::time::Clock;
use steeple_domain::{
    select_best_match, AnalysisResult, CompositeKey, Config, EventSnapshot, OrphanedOverlay,
    OverlayPatch, Partition, PatternSource, Result, StoredPattern,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::analyzer::PatternAnalyzer;
use super::ports::{PartitionSnapshot, PatternRepository};

/// Tunables for [`PatternCache`]
#[derive(Debug, Clone, Copy)]
pub struct PatternCacheSettings {
    pub timezone: Tz,
    pub staleness: chrono::Duration,
}

impl PatternCacheSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            timezone: config.calendar.timezone,
            staleness: chrono::Duration::seconds(
                i64::try_from(config.cache.pattern_staleness_secs).unwrap_or(i64::MAX),
            ),
        }
    }
}

/// Per-month pattern cache
pub struct PatternCache {
    analyzer: PatternAnalyzer,
    repository: Arc<dyn PatternRepository>,
    clock: Arc<dyn Clock>,
    settings: PatternCacheSettings,
}

impl PatternCache {
    pub fn new(
        analyzer: PatternAnalyzer,
        repository: Arc<dyn PatternRepository>,
        clock: Arc<dyn Clock>,
        settings: PatternCacheSettings,
    ) -> Self {
        Self { analyzer, repository, clock, settings }
    }

    pub async fn load(&self, partition: Partition) -> Result<Option<PartitionSnapshot>> {
        self.repository.load_partition(partition).await
    }

    /// Computed within the staleness window
    #[must_use]
    pub fn is_fresh(&self, snapshot: &PartitionSnapshot) -> bool {
        self.clock.now() - snapshot.computed_at < self.settings.staleness
    }

    /// Recompute one partition from the month's events in `snapshot`
    #[instrument(skip(self, snapshot), fields(partition = %partition))]
    pub async fn recompute(
        &self,
        partition: Partition,
        snapshot: &EventSnapshot,
    ) -> Result<Vec<StoredPattern>> {
        let month_events = snapshot.events_in(partition, self.settings.timezone);
        let analysis = self.analyzer.analyze(&month_events);

        let previous = self.repository.load_partition(partition).await?;
        let previous_rows = previous.map(|p| p.rows).unwrap_or_default();

        let now = self.clock.now();
        let (rows, orphans) = merge_with_previous(partition, analysis, previous_rows, now);
        for orphan in &orphans {
            warn!(
                partition = %partition,
                title = %orphan.title,
                day_of_week = orphan.day_of_week,
                time = %orphan.time,
                "Curated overlay orphaned by recompute; archived"
            );
        }

        self.repository.replace_partition(partition, &rows, &orphans, now).await?;
        info!(
            events = month_events.len(),
            patterns = rows.len(),
            orphaned = orphans.len(),
            "Pattern partition recomputed"
        );
        Ok(rows)
    }

    /// Persist one row's overlay (or a new manual row)
    pub async fn save_row(&self, row: &StoredPattern) -> Result<()> {
        self.repository.save_row(row).await
    }

    /// Patch the matching row in every partition
    pub async fn apply_to_series(
        &self,
        key: &CompositeKey,
        patch: &OverlayPatch,
    ) -> Result<Vec<StoredPattern>> {
        self.repository.apply_to_series(key, patch, self.clock.now()).await
    }

    /// Newest archived orphans first
    pub async fn orphaned(&self, limit: usize) -> Result<Vec<OrphanedOverlay>> {
        self.repository.list_orphans(limit).await
    }
}

/// Join fresh analyzer output with the partition's previous rows.
///
/// Each new pattern takes the overlay of its best-matching previous row.
/// Previous rows nobody matched are carried forward when they were created
/// manually, archived as orphans when they carried curated data, and dropped
/// otherwise.
#[must_use]
pub fn merge_with_previous(
    partition: Partition,
    analysis: AnalysisResult,
    previous: Vec<StoredPattern>,
    now: DateTime<Utc>,
) -> (Vec<StoredPattern>, Vec<OrphanedOverlay>) {
    let mut consumed: HashSet<String> = HashSet::new();
    let mut rows = Vec::with_capacity(analysis.patterns.len());

    for pattern in analysis.patterns {
        let mut row = StoredPattern::from_analysis(partition, pattern, now);
        let key = row.composite_key();
        let candidates = previous.iter().filter(|p| !consumed.contains(&p.id));
        if let Some(prior) = select_best_match(&key, candidates) {
            row.overlay = prior.overlay.clone();
            row.overlay_updated_at = prior.overlay_updated_at;
            consumed.insert(prior.id.clone());
        }
        rows.push(row);
    }

    let mut orphans = Vec::new();
    for prior in previous.into_iter().filter(|p| !consumed.contains(&p.id)) {
        match prior.source {
            PatternSource::Manual => rows.push(StoredPattern {
                id: Uuid::now_v7().to_string(),
                computed_at: now,
                ..prior
            }),
            PatternSource::Analyzer if prior.overlay.is_curated() => {
                orphans.push(OrphanedOverlay {
                    id: Uuid::now_v7().to_string(),
                    partition,
                    title: prior.pattern.title,
                    day_of_week: prior.pattern.day_of_week,
                    time: prior.pattern.time,
                    location: prior.pattern.location,
                    source: prior.source,
                    overlay: prior.overlay,
                    orphaned_at: now,
                });
            }
            PatternSource::Analyzer => {}
        }
    }

    (rows, orphans)
}
