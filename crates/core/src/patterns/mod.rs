//! Recurring pattern analysis and the per-month pattern cache

pub mod analyzer;
pub mod cache;
pub mod ports;

pub use analyzer::{interval_confidence, passes_threshold, PatternAnalyzer};
pub use cache::{PatternCache, PatternCacheSettings};
pub use ports::{PartitionSnapshot, PatternRepository};
