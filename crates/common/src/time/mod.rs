//! Time sources
//!
//! Cache staleness checks read the wall clock through the [`Clock`] trait so
//! tests can move time forward deterministically with [`MockClock`].

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
