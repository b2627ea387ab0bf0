//! Admin reconciliation service
//!
//! Operators attach curated metadata to an inferred pattern, to a single
//! occurrence, or to every month's copy of a pattern. References are checked
//! before anything is written, so a rejected call changes nothing.

use std::collections::HashMap;
use std::sync::Arc;

use steeple_domain::{
    select_best_match, AnnotatedEvent, CompositeKeyInput, InstanceMetadata, OverlayPatch, Result,
    SteepleError, StoredPattern,
};
use tracing::{info, instrument};

use super::ports::{DirectoryLookup, InstanceOverrideRepository};
use crate::service::CalendarService;

/// Curated metadata writes
pub struct ReconciliationService {
    calendar: Arc<CalendarService>,
    directory: Arc<dyn DirectoryLookup>,
    instance_overrides: Arc<dyn InstanceOverrideRepository>,
}

impl ReconciliationService {
    pub fn new(
        calendar: Arc<CalendarService>,
        directory: Arc<dyn DirectoryLookup>,
        instance_overrides: Arc<dyn InstanceOverrideRepository>,
    ) -> Self {
        Self { calendar, directory, instance_overrides }
    }

    /// Merge `patch` into the current month's row for `key`.
    ///
    /// A manual row is created when no computed pattern matches.
    ///
    /// # Errors
    /// `PatternNotFound` when the current month has not been computed yet,
    /// `InvalidReference` for an unknown ministry or special event type.
    #[instrument(skip(self, patch), fields(title = %input.title, day_of_week = input.day_of_week))]
    pub async fn attach_metadata(
        &self,
        input: &CompositeKeyInput,
        patch: &OverlayPatch,
    ) -> Result<StoredPattern> {
        let key = input.to_key()?;
        ensure_not_empty(patch)?;
        self.validate_references(patch).await?;

        let _guard = self.calendar.write_guard().await;
        let partition = self.calendar.current_partition();
        let snapshot = self.calendar.pattern_cache().load(partition).await?.ok_or_else(|| {
            SteepleError::PatternNotFound(format!(
                "no patterns computed for {partition}; refresh the partition first"
            ))
        })?;

        let now = self.calendar.clock().now();
        let mut row = match select_best_match(&key, &snapshot.rows) {
            Some(existing) => existing.clone(),
            None => {
                info!(partition = %partition, "No computed pattern matches; creating manual row");
                StoredPattern::manual(partition, input, now)
            }
        };
        patch.apply(&mut row.overlay);
        row.overlay_updated_at = Some(now);

        self.calendar.pattern_cache().save_row(&row).await?;
        Ok(row)
    }

    /// Override metadata on one occurrence without touching its series
    ///
    /// # Errors
    /// `NotFound` when the occurrence is not in the current event snapshot.
    #[instrument(skip(self, patch))]
    pub async fn attach_metadata_to_instance(
        &self,
        external_id: &str,
        patch: &OverlayPatch,
    ) -> Result<InstanceMetadata> {
        ensure_not_empty(patch)?;
        self.validate_references(patch).await?;

        let event = self.calendar.event_cache().find_event(external_id).await?.ok_or_else(|| {
            SteepleError::NotFound(format!(
                "event {external_id} is not in the current calendar snapshot"
            ))
        })?;
        let instance_override = self
            .instance_overrides
            .upsert(external_id, patch, self.calendar.clock().now())
            .await?;

        Ok(InstanceMetadata { event, instance_override })
    }

    /// The calendar listing with each occurrence's override attached
    #[instrument(skip(self))]
    pub async fn annotated_events(&self, force_refresh: bool) -> Result<Vec<AnnotatedEvent>> {
        let events = self.calendar.get_events(force_refresh).await?;
        let mut overrides: HashMap<String, _> = self
            .instance_overrides
            .list()
            .await?
            .into_iter()
            .map(|o| (o.external_id.clone(), o))
            .collect();

        Ok(events
            .into_iter()
            .map(|event| {
                let instance_override = overrides.remove(&event.external_id);
                AnnotatedEvent::new(event, instance_override)
            })
            .collect())
    }

    /// One occurrence and its override, if any
    ///
    /// # Errors
    /// `NotFound` when the occurrence is not in the current event snapshot.
    #[instrument(skip(self))]
    pub async fn instance_metadata(&self, external_id: &str) -> Result<AnnotatedEvent> {
        let event = self.calendar.event_cache().find_event(external_id).await?.ok_or_else(|| {
            SteepleError::NotFound(format!(
                "event {external_id} is not in the current calendar snapshot"
            ))
        })?;
        let instance_override = self.instance_overrides.get(external_id).await?;
        Ok(AnnotatedEvent::new(event, instance_override))
    }

    /// Apply `patch` to every matching pattern in every cached month. A key
    /// without a location reaches the series in every room.
    ///
    /// Returns the number of rows updated; zero when nothing matches.
    #[instrument(skip(self, patch), fields(title = %input.title, day_of_week = input.day_of_week))]
    pub async fn apply_to_series(
        &self,
        input: &CompositeKeyInput,
        patch: &OverlayPatch,
    ) -> Result<usize> {
        let key = input.to_key()?;
        ensure_not_empty(patch)?;
        self.validate_references(patch).await?;

        let _guard = self.calendar.write_guard().await;
        let updated = self.calendar.pattern_cache().apply_to_series(&key, patch).await?;
        info!(updated = updated.len(), "Applied metadata to series");
        Ok(updated.len())
    }

    async fn validate_references(&self, patch: &OverlayPatch) -> Result<()> {
        if let Some(id) = patch.ministry_reference() {
            if !self.directory.ministry_exists(id).await? {
                return Err(SteepleError::InvalidReference(format!("ministry {id}")));
            }
        }
        if let Some(id) = patch.special_event_type_reference() {
            if !self.directory.special_event_type_exists(id).await? {
                return Err(SteepleError::InvalidReference(format!("special event type {id}")));
            }
        }
        Ok(())
    }
}

fn ensure_not_empty(patch: &OverlayPatch) -> Result<()> {
    if patch.is_empty() {
        return Err(SteepleError::InvalidInput("metadata patch has no fields".into()));
    }
    Ok(())
}
