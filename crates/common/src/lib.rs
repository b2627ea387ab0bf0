//! Modular common utilities shared across Steeple crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: clock abstraction
//! - `runtime`: foundation plus tracing-instrumented helpers
//! - `platform`: SQLite storage (r2d2 pool, pragmas, metrics)
//! - `test-utils`: re-exports for deterministic tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod time;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod storage;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "runtime", feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "platform")]
pub use storage::{SqlitePool, SqlitePoolConfig, StorageError, StorageResult};
#[cfg(feature = "foundation")]
pub use time::{Clock, MockClock, SystemClock};
