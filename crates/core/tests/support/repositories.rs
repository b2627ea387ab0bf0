//! In-memory mocks for the pattern and admin ports

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use steeple_core::{DirectoryLookup, InstanceOverrideRepository, PartitionSnapshot, PatternRepository};
use steeple_domain::{
    CompositeKey, InstanceOverride, OrphanedOverlay, OverlayPatch, Partition,
    Result as DomainResult, StoredPattern, SteepleError,
};

/// Pattern partitions held in a map; replace swaps one entry
#[derive(Default, Clone)]
pub struct InMemoryPatternRepository {
    partitions: Arc<Mutex<BTreeMap<Partition, PartitionSnapshot>>>,
    orphans: Arc<Mutex<Vec<OrphanedOverlay>>>,
    replace_count: Arc<Mutex<usize>>,
}

impl InMemoryPatternRepository {
    /// Seed a partition directly
    pub fn insert(&self, snapshot: PartitionSnapshot) {
        self.partitions.lock().unwrap().insert(snapshot.partition, snapshot);
    }

    pub fn rows(&self, partition: Partition) -> Vec<StoredPattern> {
        self.partitions
            .lock()
            .unwrap()
            .get(&partition)
            .map(|s| s.rows.clone())
            .unwrap_or_default()
    }

    pub fn replace_count(&self) -> usize {
        *self.replace_count.lock().unwrap()
    }
}

#[async_trait]
impl PatternRepository for InMemoryPatternRepository {
    async fn load_partition(&self, partition: Partition) -> DomainResult<Option<PartitionSnapshot>> {
        Ok(self.partitions.lock().unwrap().get(&partition).cloned())
    }

    async fn replace_partition(
        &self,
        partition: Partition,
        rows: &[StoredPattern],
        orphans: &[OrphanedOverlay],
        computed_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.partitions
            .lock()
            .unwrap()
            .insert(partition, PartitionSnapshot { partition, computed_at, rows: rows.to_vec() });
        self.orphans.lock().unwrap().extend_from_slice(orphans);
        *self.replace_count.lock().unwrap() += 1;
        Ok(())
    }

    async fn save_row(&self, row: &StoredPattern) -> DomainResult<()> {
        let mut partitions = self.partitions.lock().unwrap();
        let snapshot = partitions
            .get_mut(&row.partition)
            .ok_or_else(|| SteepleError::PatternNotFound(row.partition.to_string()))?;
        match snapshot.rows.iter_mut().find(|r| r.id == row.id) {
            Some(existing) => *existing = row.clone(),
            None => snapshot.rows.push(row.clone()),
        }
        Ok(())
    }

    async fn apply_to_series(
        &self,
        key: &CompositeKey,
        patch: &OverlayPatch,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<Vec<StoredPattern>> {
        let mut partitions = self.partitions.lock().unwrap();
        let mut updated = Vec::new();
        for snapshot in partitions.values_mut() {
            for row in snapshot.rows.iter_mut().filter(|r| key.matches(&r.composite_key())) {
                patch.apply(&mut row.overlay);
                row.overlay_updated_at = Some(updated_at);
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn list_orphans(&self, limit: usize) -> DomainResult<Vec<OrphanedOverlay>> {
        Ok(self.orphans.lock().unwrap().iter().rev().take(limit).cloned().collect())
    }
}

/// Directory with a fixed set of known ids
#[derive(Default, Clone)]
pub struct InMemoryDirectory {
    ministries: HashSet<i64>,
    special_event_types: HashSet<i64>,
}

impl InMemoryDirectory {
    pub fn new(ministries: &[i64], special_event_types: &[i64]) -> Self {
        Self {
            ministries: ministries.iter().copied().collect(),
            special_event_types: special_event_types.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl DirectoryLookup for InMemoryDirectory {
    async fn ministry_exists(&self, id: i64) -> DomainResult<bool> {
        Ok(self.ministries.contains(&id))
    }

    async fn special_event_type_exists(&self, id: i64) -> DomainResult<bool> {
        Ok(self.special_event_types.contains(&id))
    }
}

#[derive(Default, Clone)]
pub struct InMemoryInstanceOverrides {
    overrides: Arc<Mutex<HashMap<String, InstanceOverride>>>,
}

impl InMemoryInstanceOverrides {
    pub fn len(&self) -> usize {
        self.overrides.lock().unwrap().len()
    }
}

#[async_trait]
impl InstanceOverrideRepository for InMemoryInstanceOverrides {
    async fn get(&self, external_id: &str) -> DomainResult<Option<InstanceOverride>> {
        Ok(self.overrides.lock().unwrap().get(external_id).cloned())
    }

    async fn list(&self) -> DomainResult<Vec<InstanceOverride>> {
        let mut all: Vec<_> = self.overrides.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        Ok(all)
    }

    async fn upsert(
        &self,
        external_id: &str,
        patch: &OverlayPatch,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<InstanceOverride> {
        let mut overrides = self.overrides.lock().unwrap();
        let entry = overrides.entry(external_id.to_string()).or_insert_with(|| InstanceOverride {
            external_id: external_id.to_string(),
            overlay: Default::default(),
            updated_at,
        });
        patch.apply(&mut entry.overlay);
        entry.updated_at = updated_at;
        Ok(entry.clone())
    }
}
