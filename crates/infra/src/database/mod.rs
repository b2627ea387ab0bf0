//! Database implementations

pub mod admin_repository;
pub mod event_snapshot_repository;
pub mod manager;
pub mod pattern_repository;
mod rows;

pub use admin_repository::*;
pub use event_snapshot_repository::*;
pub use manager::*;
pub use pattern_repository::*;
