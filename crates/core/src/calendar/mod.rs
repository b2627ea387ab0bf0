//! Raw calendar event cache

pub mod event_cache;
pub mod ports;

pub use event_cache::{EventCache, RefreshOutcome};
pub use ports::{EventSnapshotRepository, EventSource, RefreshLogRepository};
