//! Port interfaces for the admin reconciliation layer

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use steeple_domain::{InstanceOverride, OverlayPatch, Result};

/// Existence checks against directories owned elsewhere
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    async fn ministry_exists(&self, id: i64) -> Result<bool>;

    async fn special_event_type_exists(&self, id: i64) -> Result<bool>;
}

/// Per-occurrence overrides, keyed by the provider's event id
#[async_trait]
pub trait InstanceOverrideRepository: Send + Sync {
    async fn get(&self, external_id: &str) -> Result<Option<InstanceOverride>>;

    /// Every stored override, including those whose event has left the calendar
    async fn list(&self) -> Result<Vec<InstanceOverride>>;

    /// Merge `patch` into the stored override (or an empty one) and return
    /// the result. Read and write happen in one transaction.
    async fn upsert(
        &self,
        external_id: &str,
        patch: &OverlayPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<InstanceOverride>;
}
