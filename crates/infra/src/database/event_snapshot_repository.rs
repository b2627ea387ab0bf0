//! SQLite implementation of the raw event snapshot and refresh log ports.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use steeple_core::{EventSnapshotRepository, RefreshLogRepository};
use steeple_domain::{CacheRefreshRecord, EventSnapshot, RawEvent, Result};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::manager::{DbManager, InfraResult};
use super::rows::{read_instant, read_label};

const EVENT_COLUMNS: &str = "external_id, title, start_at, end_at, location, description, \
     is_all_day, is_part_of_recurring_series";

/// Snapshot store using a generation head pointer.
///
/// A replacement writes the new generation, repoints the head and drops the
/// old generation inside one IMMEDIATE transaction.
pub struct SqliteEventSnapshotRepository {
    db: Arc<DbManager>,
}

impl SqliteEventSnapshotRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventSnapshotRepository for SqliteEventSnapshotRepository {
    #[instrument(skip(self))]
    async fn load_snapshot(&self) -> Result<Option<EventSnapshot>> {
        self.db
            .run(|conn| {
                let tx = conn.transaction()?;
                let snapshot = read_snapshot(&tx)?;
                tx.commit()?;
                Ok(snapshot)
            })
            .await
    }

    #[instrument(skip(self, snapshot), fields(event_count = snapshot.events.len()))]
    async fn replace_snapshot(&self, snapshot: &EventSnapshot) -> Result<()> {
        let snapshot = snapshot.clone();
        self.db
            .run(move |conn| {
                let generation = Uuid::now_v7().to_string();
                let tx = conn.immediate_transaction()?;

                let previous: Option<String> = tx
                    .query_row("SELECT generation FROM event_snapshot_head WHERE id = 1", [], |row| {
                        row.get(0)
                    })
                    .optional()?;

                {
                    let mut insert = tx.prepare(&format!(
                        "INSERT INTO raw_events (generation, position, {EVENT_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                    ))?;
                    for (position, event) in snapshot.events.iter().enumerate() {
                        insert.execute(params![
                            generation,
                            i64::try_from(position).unwrap_or(i64::MAX),
                            event.external_id,
                            event.title,
                            event.start.timestamp_millis(),
                            event.end.timestamp_millis(),
                            event.location,
                            event.description,
                            event.is_all_day,
                            event.is_part_of_recurring_series,
                        ])?;
                    }
                }

                tx.execute(
                    "INSERT INTO event_snapshot_head (id, generation, window_start, window_end, refreshed_at)
                     VALUES (1, ?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                        generation = excluded.generation,
                        window_start = excluded.window_start,
                        window_end = excluded.window_end,
                        refreshed_at = excluded.refreshed_at",
                    params![
                        generation,
                        snapshot.window_start.timestamp_millis(),
                        snapshot.window_end.timestamp_millis(),
                        snapshot.refreshed_at.timestamp_millis(),
                    ],
                )?;

                if let Some(previous) = previous {
                    let dropped =
                        tx.execute("DELETE FROM raw_events WHERE generation = ?1", [&previous])?;
                    debug!(previous_generation = %previous, dropped, "dropped previous snapshot");
                }

                tx.commit()?;
                Ok(())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn find_event(&self, external_id: &str) -> Result<Option<RawEvent>> {
        let external_id = external_id.to_string();
        self.db
            .run(move |conn| {
                let event = conn
                    .query_row(
                        &format!(
                            "SELECT {EVENT_COLUMNS} FROM raw_events e
                             JOIN event_snapshot_head h ON h.generation = e.generation
                             WHERE h.id = 1 AND e.external_id = ?1"
                        ),
                        [&external_id],
                        read_event,
                    )
                    .optional()?;
                Ok(event)
            })
            .await
    }
}

fn read_snapshot(conn: &Connection) -> InfraResult<Option<EventSnapshot>> {
    let head = conn
        .query_row(
            "SELECT generation, window_start, window_end, refreshed_at
             FROM event_snapshot_head WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>("generation")?,
                    read_instant(row, "window_start")?,
                    read_instant(row, "window_end")?,
                    read_instant(row, "refreshed_at")?,
                ))
            },
        )
        .optional()?;

    let Some((generation, window_start, window_end, refreshed_at)) = head else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM raw_events WHERE generation = ?1 ORDER BY position"
    ))?;
    let events = stmt
        .query_map([&generation], read_event)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(EventSnapshot { events, window_start, window_end, refreshed_at }))
}

fn read_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEvent> {
    Ok(RawEvent {
        external_id: row.get("external_id")?,
        title: row.get("title")?,
        start: read_instant(row, "start_at")?,
        end: read_instant(row, "end_at")?,
        location: row.get("location")?,
        description: row.get("description")?,
        is_all_day: row.get("is_all_day")?,
        is_part_of_recurring_series: row.get("is_part_of_recurring_series")?,
    })
}

/// Append-only refresh log
pub struct SqliteRefreshLogRepository {
    db: Arc<DbManager>,
}

impl SqliteRefreshLogRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RefreshLogRepository for SqliteRefreshLogRepository {
    #[instrument(skip(self, record), fields(refresh_kind = %record.refresh_kind, succeeded = record.succeeded))]
    async fn append(&self, record: &CacheRefreshRecord) -> Result<()> {
        let record = record.clone();
        self.db
            .run(move |conn| {
                conn.execute(
                    "INSERT INTO cache_refresh_log (
                        id, refresh_kind, event_count, succeeded, error_message,
                        duration_ms, source, refreshed_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        record.id,
                        record.refresh_kind.as_str(),
                        record.event_count,
                        record.succeeded,
                        record.error_message,
                        record.duration_ms,
                        record.source.as_str(),
                        record.refreshed_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn recent(&self, limit: usize) -> Result<Vec<CacheRefreshRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .run(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, refresh_kind, event_count, succeeded, error_message,
                            duration_ms, source, refreshed_at
                     FROM cache_refresh_log
                     ORDER BY refreshed_at DESC, seq DESC
                     LIMIT ?1",
                )?;
                let records = stmt
                    .query_map([limit], |row| {
                        Ok(CacheRefreshRecord {
                            id: row.get("id")?,
                            refresh_kind: read_label(row, "refresh_kind")?,
                            event_count: row.get("event_count")?,
                            succeeded: row.get("succeeded")?,
                            error_message: row.get("error_message")?,
                            duration_ms: row.get("duration_ms")?,
                            source: read_label(row, "source")?,
                            refreshed_at: read_instant(row, "refreshed_at")?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await
    }
}
