//! # Steeple Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits)
//! - The recurring pattern analyzer
//! - Event cache, pattern cache and admin reconciliation services
//!
//! ## Architecture Principles
//! - Only depends on `steeple-common` and `steeple-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod admin;
pub mod calendar;
pub mod patterns;
pub mod service;

// Re-export specific items to avoid ambiguity
pub use admin::{DirectoryLookup, InstanceOverrideRepository, ReconciliationService};
pub use calendar::event_cache::EventCacheSettings;
pub use calendar::{EventCache, EventSnapshotRepository, EventSource, RefreshLogRepository, RefreshOutcome};
pub use patterns::{
    PartitionSnapshot, PatternAnalyzer, PatternCache, PatternCacheSettings, PatternRepository,
};
pub use service::{CalendarService, RefreshReport};
