//! Testing utilities
//!
//! Deterministic time for cache and scheduling tests.

pub use crate::time::{Clock, MockClock, SystemClock};
