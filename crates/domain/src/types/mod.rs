//! Domain types and models

pub mod event;
pub mod key;
pub mod overlay;
pub mod partition;
pub mod pattern;
pub mod refresh;

pub use event::{dedupe_by_external_id, EventSnapshot, RawEvent};
pub use key::{CompositeKey, CompositeKeyInput};
pub use overlay::{
    AnnotatedEvent, InstanceMetadata, InstanceOverride, OrphanedOverlay, OverlayPatch,
    PatternOverlay,
};
pub use partition::{local_midnight, Partition};
pub use pattern::{
    select_best_match, AnalysisResult, Frequency, PatternSource, RecurringPattern, StoredPattern,
};
pub use refresh::{CacheRefreshRecord, RefreshKind, RefreshSource};
