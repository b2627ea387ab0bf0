//! SQLite implementation of the recurring pattern partition store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use steeple_core::{PartitionSnapshot, PatternRepository};
use steeple_domain::{
    CompositeKey, OrphanedOverlay, OverlayPatch, Partition, RecurringPattern,
    Result, SteepleError, StoredPattern,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::manager::{DbManager, InfraResult};
use super::rows::{
    overlay_assignments, read_instant, read_json, read_label, read_optional_instant,
    read_optional_label, read_overlay, OverlayParams, OVERLAY_COLUMNS,
};
use crate::errors::InfraError;

const PATTERN_COLUMNS: &str = "id, year, month, title, day_of_week, time, location, frequency, \
     confidence, matched_event_ids, ministry_tag, source, computed_at, overlay_updated_at";

/// Partitioned pattern store.
///
/// Each (month, year) has a head row in `pattern_partitions` naming its live
/// generation. Replacing a partition stages the new rows under a fresh
/// generation and swaps the head in the same IMMEDIATE transaction.
pub struct SqlitePatternRepository {
    db: Arc<DbManager>,
}

impl SqlitePatternRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PatternRepository for SqlitePatternRepository {
    #[instrument(skip(self), fields(partition = %partition))]
    async fn load_partition(&self, partition: Partition) -> Result<Option<PartitionSnapshot>> {
        self.db
            .run(move |conn| {
                let tx = conn.transaction()?;
                let snapshot = read_partition(&tx, partition)?;
                tx.commit()?;
                Ok(snapshot.map(|(_, snapshot)| snapshot))
            })
            .await
    }

    #[instrument(
        skip(self, rows, orphans),
        fields(partition = %partition, rows = rows.len(), orphans = orphans.len())
    )]
    async fn replace_partition(
        &self,
        partition: Partition,
        rows: &[StoredPattern],
        orphans: &[OrphanedOverlay],
        computed_at: DateTime<Utc>,
    ) -> Result<()> {
        let rows = rows.to_vec();
        let orphans = orphans.to_vec();
        self.db
            .run(move |conn| {
                let generation = Uuid::now_v7().to_string();
                let tx = conn.immediate_transaction()?;

                let previous = head_generation(&tx, partition)?;

                for (position, row) in rows.iter().enumerate() {
                    insert_row(&tx, &generation, position, row)?;
                }
                for orphan in &orphans {
                    insert_orphan(&tx, orphan)?;
                }

                tx.execute(
                    "INSERT INTO pattern_partitions (year, month, generation, computed_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(year, month) DO UPDATE SET
                        generation = excluded.generation,
                        computed_at = excluded.computed_at",
                    params![partition.year, partition.month, generation, computed_at.timestamp_millis()],
                )?;

                if let Some(previous) = previous {
                    let dropped = tx
                        .execute("DELETE FROM recurring_patterns WHERE generation = ?1", [&previous])?;
                    debug!(previous_generation = %previous, dropped, "dropped previous partition rows");
                }

                tx.commit()?;
                Ok(())
            })
            .await
    }

    #[instrument(skip(self, row), fields(partition = %row.partition, id = %row.id))]
    async fn save_row(&self, row: &StoredPattern) -> Result<()> {
        let row = row.clone();
        self.db
            .run(move |conn| {
                let tx = conn.immediate_transaction()?;
                let generation = head_generation(&tx, row.partition)?.ok_or_else(|| {
                    InfraError(SteepleError::PatternNotFound(format!(
                        "no patterns computed for {}",
                        row.partition
                    )))
                })?;

                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM recurring_patterns WHERE generation = ?1 AND id = ?2)",
                    [&generation, &row.id],
                    |r| r.get(0),
                )?;

                if exists {
                    update_row(&tx, &generation, &row)?;
                } else {
                    let next: i64 = tx.query_row(
                        "SELECT COALESCE(MAX(position) + 1, 0) FROM recurring_patterns WHERE generation = ?1",
                        [&generation],
                        |r| r.get(0),
                    )?;
                    insert_row(&tx, &generation, usize::try_from(next).unwrap_or(0), &row)?;
                }

                tx.commit()?;
                Ok(())
            })
            .await
    }

    #[instrument(skip(self, key, patch), fields(title = %key.title, day_of_week = key.day_of_week, time = %key.time))]
    async fn apply_to_series(
        &self,
        key: &CompositeKey,
        patch: &OverlayPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Vec<StoredPattern>> {
        let key = key.clone();
        let patch = patch.clone();
        self.db
            .run(move |conn| {
                let tx = conn.immediate_transaction()?;

                let partitions = list_partitions(&tx)?;

                let mut updated = Vec::new();
                for partition in partitions {
                    let Some((generation, snapshot)) = read_partition(&tx, partition)? else {
                        continue;
                    };
                    for row in snapshot.rows {
                        if !key.matches(&row.composite_key()) {
                            continue;
                        }
                        let mut row = row;
                        patch.apply(&mut row.overlay);
                        row.overlay_updated_at = Some(updated_at);

                        update_row(&tx, &generation, &row)?;
                        updated.push(row);
                    }
                }

                tx.commit()?;
                Ok(updated)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn list_orphans(&self, limit: usize) -> Result<Vec<OrphanedOverlay>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .run(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, year, month, title, day_of_week, time, location, source,
                            {OVERLAY_COLUMNS}, orphaned_at
                     FROM orphaned_overlays
                     ORDER BY orphaned_at DESC, seq DESC
                     LIMIT ?1"
                ))?;
                let orphans = stmt
                    .query_map([limit], |row| {
                        Ok(OrphanedOverlay {
                            id: row.get("id")?,
                            partition: Partition { year: row.get("year")?, month: row.get("month")? },
                            title: row.get("title")?,
                            day_of_week: row.get("day_of_week")?,
                            time: row.get("time")?,
                            location: row.get("location")?,
                            source: read_label(row, "source")?,
                            overlay: read_overlay(row)?,
                            orphaned_at: read_instant(row, "orphaned_at")?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(orphans)
            })
            .await
    }
}

fn head_generation(conn: &Connection, partition: Partition) -> InfraResult<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT generation FROM pattern_partitions WHERE year = ?1 AND month = ?2",
            params![partition.year, partition.month],
            |row| row.get(0),
        )
        .optional()?)
}

fn list_partitions(conn: &Connection) -> InfraResult<Vec<Partition>> {
    let mut stmt = conn.prepare("SELECT year, month FROM pattern_partitions ORDER BY year, month")?;
    let partitions = stmt
        .query_map([], |row| Ok(Partition { year: row.get(0)?, month: row.get(1)? }))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(partitions)
}

/// Live generation id and rows of a partition
fn read_partition(
    conn: &Connection,
    partition: Partition,
) -> InfraResult<Option<(String, PartitionSnapshot)>> {
    let head = conn
        .query_row(
            "SELECT generation, computed_at FROM pattern_partitions WHERE year = ?1 AND month = ?2",
            params![partition.year, partition.month],
            |row| Ok((row.get::<_, String>("generation")?, read_instant(row, "computed_at")?)),
        )
        .optional()?;

    let Some((generation, computed_at)) = head else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {PATTERN_COLUMNS}, {OVERLAY_COLUMNS}
         FROM recurring_patterns
         WHERE generation = ?1
         ORDER BY position"
    ))?;
    let rows = stmt.query_map([&generation], read_pattern)?.collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some((generation, PartitionSnapshot { partition, computed_at, rows })))
}

fn read_pattern(row: &Row<'_>) -> rusqlite::Result<StoredPattern> {
    Ok(StoredPattern {
        id: row.get("id")?,
        partition: Partition { year: row.get("year")?, month: row.get("month")? },
        pattern: RecurringPattern {
            title: row.get("title")?,
            day_of_week: row.get("day_of_week")?,
            time: row.get("time")?,
            location: row.get("location")?,
            frequency: read_label(row, "frequency")?,
            confidence: row.get("confidence")?,
            matched_event_ids: read_json(row, "matched_event_ids")?,
            ministry_tag: read_optional_label(row, "ministry_tag")?,
        },
        overlay: read_overlay(row)?,
        source: read_label(row, "source")?,
        computed_at: read_instant(row, "computed_at")?,
        overlay_updated_at: read_optional_instant(row, "overlay_updated_at")?,
    })
}

/// Owned computed-column values in [`PATTERN_COLUMNS`] order.
struct PatternParams {
    id: String,
    year: i32,
    month: u32,
    title: String,
    day_of_week: u8,
    time: String,
    location: Option<String>,
    frequency: &'static str,
    confidence: f64,
    matched_event_ids: String,
    ministry_tag: Option<&'static str>,
    source: &'static str,
    computed_at: i64,
    overlay_updated_at: Option<i64>,
}

impl PatternParams {
    fn new(row: &StoredPattern) -> InfraResult<Self> {
        Ok(Self {
            id: row.id.clone(),
            year: row.partition.year,
            month: row.partition.month,
            title: row.pattern.title.clone(),
            day_of_week: row.pattern.day_of_week,
            time: row.pattern.time.clone(),
            location: row.pattern.location.clone(),
            frequency: row.pattern.frequency.as_str(),
            confidence: row.pattern.confidence,
            matched_event_ids: serde_json::to_string(&row.pattern.matched_event_ids)?,
            ministry_tag: row.pattern.ministry_tag.map(|tag| tag.as_str()),
            source: row.source.as_str(),
            computed_at: row.computed_at.timestamp_millis(),
            overlay_updated_at: row.overlay_updated_at.map(|at| at.timestamp_millis()),
        })
    }

    fn as_params(&self) -> [&dyn ToSql; 14] {
        [
            &self.id,
            &self.year,
            &self.month,
            &self.title,
            &self.day_of_week,
            &self.time,
            &self.location,
            &self.frequency,
            &self.confidence,
            &self.matched_event_ids,
            &self.ministry_tag,
            &self.source,
            &self.computed_at,
            &self.overlay_updated_at,
        ]
    }
}

fn insert_row(
    conn: &Connection,
    generation: &str,
    position: usize,
    row: &StoredPattern,
) -> InfraResult<()> {
    let pattern = PatternParams::new(row)?;
    let overlay = OverlayParams::new(&row.overlay);
    let position = i64::try_from(position).unwrap_or(i64::MAX);

    let placeholders = (3..=26).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
    let mut values: Vec<&dyn ToSql> = vec![&generation, &position];
    values.extend(pattern.as_params());
    values.extend(overlay.as_params());

    conn.execute(
        &format!(
            "INSERT INTO recurring_patterns (generation, position, {PATTERN_COLUMNS}, {OVERLAY_COLUMNS})
             VALUES (?1, ?2, {placeholders})"
        ),
        values.as_slice(),
    )?;
    Ok(())
}

/// Rewrite the overlay and bookkeeping of an existing row.
fn update_row(conn: &Connection, generation: &str, row: &StoredPattern) -> InfraResult<()> {
    let overlay = OverlayParams::new(&row.overlay);
    let overlay_updated_at = row.overlay_updated_at.map(|at| at.timestamp_millis());

    let mut values: Vec<&dyn ToSql> = vec![&generation, &row.id, &overlay_updated_at];
    values.extend(overlay.as_params());

    conn.execute(
        &format!(
            "UPDATE recurring_patterns SET overlay_updated_at = ?3, {}
             WHERE generation = ?1 AND id = ?2",
            overlay_assignments(4)
        ),
        values.as_slice(),
    )?;
    Ok(())
}

fn insert_orphan(conn: &Connection, orphan: &OrphanedOverlay) -> InfraResult<()> {
    let overlay = OverlayParams::new(&orphan.overlay);
    let source = orphan.source.as_str();
    let orphaned_at = orphan.orphaned_at.timestamp_millis();

    let mut values: Vec<&dyn ToSql> = vec![
        &orphan.id,
        &orphan.partition.year,
        &orphan.partition.month,
        &orphan.title,
        &orphan.day_of_week,
        &orphan.time,
        &orphan.location,
        &source,
        &orphaned_at,
    ];
    values.extend(overlay.as_params());

    let placeholders = (10..=19).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
    conn.execute(
        &format!(
            "INSERT INTO orphaned_overlays (
                id, year, month, title, day_of_week, time, location, source, orphaned_at,
                {OVERLAY_COLUMNS}
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, {placeholders})"
        ),
        values.as_slice(),
    )?;
    Ok(())
}
