//! Port interfaces for the recurring pattern cache

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use steeple_domain::{
    CompositeKey, OrphanedOverlay, OverlayPatch, Partition, Result, StoredPattern,
};

/// One computed partition as stored
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSnapshot {
    pub partition: Partition,
    pub computed_at: DateTime<Utc>,
    /// Ordered as written
    pub rows: Vec<StoredPattern>,
}

/// Persisted pattern partitions
#[async_trait]
pub trait PatternRepository: Send + Sync {
    /// `None` when the partition has never been computed
    async fn load_partition(&self, partition: Partition) -> Result<Option<PartitionSnapshot>>;

    /// Replace a partition's rows and archive orphaned overlays in one
    /// atomic step. Other partitions are untouched.
    async fn replace_partition(
        &self,
        partition: Partition,
        rows: &[StoredPattern],
        orphans: &[OrphanedOverlay],
        computed_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Insert or update one row of an existing partition.
    ///
    /// Fails with `PatternNotFound` when the partition has not been computed.
    async fn save_row(&self, row: &StoredPattern) -> Result<()>;

    /// Apply `patch` to every row the key matches in every partition, all in
    /// one transaction. A blank location matches every location. Returns the
    /// updated rows.
    async fn apply_to_series(
        &self,
        key: &CompositeKey,
        patch: &OverlayPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Vec<StoredPattern>>;

    /// Newest first
    async fn list_orphans(&self, limit: usize) -> Result<Vec<OrphanedOverlay>>;
}
