//! SQLite implementations of the admin reconciliation ports.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use steeple_core::{DirectoryLookup, InstanceOverrideRepository};
use steeple_domain::{InstanceOverride, OverlayPatch, PatternOverlay, Result};
use tracing::instrument;

use super::manager::{DbManager, InfraResult};
use super::rows::{overlay_assignments, read_instant, read_overlay, OverlayParams, OVERLAY_COLUMNS};

/// Per-occurrence overrides keyed by the provider's event id
pub struct SqliteInstanceOverrideRepository {
    db: Arc<DbManager>,
}

impl SqliteInstanceOverrideRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InstanceOverrideRepository for SqliteInstanceOverrideRepository {
    #[instrument(skip(self))]
    async fn get(&self, external_id: &str) -> Result<Option<InstanceOverride>> {
        let external_id = external_id.to_string();
        self.db.run(move |conn| read_override(conn, &external_id)).await
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<InstanceOverride>> {
        self.db
            .run(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT external_id, {OVERLAY_COLUMNS}, updated_at
                     FROM event_instance_overrides
                     ORDER BY external_id"
                ))?;
                let overrides = stmt
                    .query_map([], map_override)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(overrides)
            })
            .await
    }

    #[instrument(skip(self, patch))]
    async fn upsert(
        &self,
        external_id: &str,
        patch: &OverlayPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<InstanceOverride> {
        let external_id = external_id.to_string();
        let patch = patch.clone();
        self.db
            .run(move |conn| {
                let tx = conn.immediate_transaction()?;

                let mut overlay =
                    read_override(&tx, &external_id)?.map(|o| o.overlay).unwrap_or_default();
                patch.apply(&mut overlay);

                write_override(&tx, &external_id, &overlay, updated_at)?;
                tx.commit()?;

                Ok(InstanceOverride { external_id, overlay, updated_at })
            })
            .await
    }
}

fn write_override(
    conn: &Connection,
    external_id: &str,
    overlay: &PatternOverlay,
    updated_at: DateTime<Utc>,
) -> InfraResult<()> {
    let params = OverlayParams::new(overlay);
    let updated_millis = updated_at.timestamp_millis();
    let mut values: Vec<&dyn ToSql> = vec![&external_id, &updated_millis];
    values.extend(params.as_params());

    let placeholders = (3..=12).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
    conn.execute(
        &format!(
            "INSERT INTO event_instance_overrides (external_id, updated_at, {OVERLAY_COLUMNS})
             VALUES (?1, ?2, {placeholders})
             ON CONFLICT(external_id) DO UPDATE SET updated_at = ?2, {}",
            overlay_assignments(3)
        ),
        values.as_slice(),
    )?;
    Ok(())
}

fn read_override(conn: &Connection, external_id: &str) -> InfraResult<Option<InstanceOverride>> {
    let found = conn
        .query_row(
            &format!(
                "SELECT external_id, {OVERLAY_COLUMNS}, updated_at
                 FROM event_instance_overrides WHERE external_id = ?1"
            ),
            [external_id],
            map_override,
        )
        .optional()?;
    Ok(found)
}

fn map_override(row: &Row<'_>) -> rusqlite::Result<InstanceOverride> {
    Ok(InstanceOverride {
        external_id: row.get("external_id")?,
        overlay: read_overlay(row)?,
        updated_at: read_instant(row, "updated_at")?,
    })
}

/// Existence checks against the ministry and special event type directories
pub struct SqliteDirectory {
    db: Arc<DbManager>,
}

impl SqliteDirectory {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Register or rename a ministry
    #[instrument(skip(self, name))]
    pub async fn upsert_ministry(&self, id: i64, name: &str) -> Result<()> {
        self.upsert("ministries", id, name).await
    }

    /// Register or rename a special event type
    #[instrument(skip(self, name))]
    pub async fn upsert_special_event_type(&self, id: i64, name: &str) -> Result<()> {
        self.upsert("special_event_types", id, name).await
    }

    async fn upsert(&self, table: &'static str, id: i64, name: &str) -> Result<()> {
        let name = name.to_string();
        self.db
            .run(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO {table} (id, name) VALUES (?1, ?2)
                         ON CONFLICT(id) DO UPDATE SET name = excluded.name"
                    ),
                    params![id, name],
                )?;
                Ok(())
            })
            .await
    }

    async fn exists(&self, table: &'static str, id: i64) -> Result<bool> {
        self.db
            .run(move |conn| {
                let exists = conn.query_row(
                    &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
                    [id],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
    }
}

#[async_trait]
impl DirectoryLookup for SqliteDirectory {
    #[instrument(skip(self))]
    async fn ministry_exists(&self, id: i64) -> Result<bool> {
        self.exists("ministries", id).await
    }

    #[instrument(skip(self))]
    async fn special_event_type_exists(&self, id: i64) -> Result<bool> {
        self.exists("special_event_types", id).await
    }
}
