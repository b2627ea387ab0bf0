//! Clock abstraction for testable time-dependent code

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Source of wall-clock time
pub trait Clock: Send + Sync + 'static {
    /// Current UTC instant
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since the UNIX epoch
    fn millis_since_epoch(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for deterministic tests
///
/// Clones share the same underlying time, so a test can hand one clone to a
/// service and advance another.
///
/// ```
/// use std::time::Duration;
///
/// use steeple_common::time::{Clock, MockClock};
///
/// let clock = MockClock::new();
/// let before = clock.now();
/// clock.advance(Duration::from_secs(90));
/// assert_eq!((clock.now() - before).num_seconds(), 90);
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a mock clock pinned to a specific instant
    pub fn at(start: DateTime<Utc>) -> Self {
        Self { current: Arc::new(Mutex::new(start)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut current) = self.current.lock() {
            let step = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
            *current += step;
        }
    }

    /// Set the mock clock to a specific instant
    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut current) = self.current.lock() {
            *current = instant;
        }
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        self.current.lock().map(|current| *current).unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}
