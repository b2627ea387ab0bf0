//! # Steeple Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite repositories with staged snapshot and partition replacement
//! - Calendar event sources (Google Calendar, seed-data file)
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `steeple-core`
//! - Depends on `steeple-common`, `steeple-domain` and `steeple-core`
//! - Contains all "impure" code (I/O, HTTP, SQLite)

pub mod config;
pub mod database;
pub mod errors;
pub mod integrations;

// Re-export commonly used items
pub use database::*;
pub use errors::InfraError;
pub use integrations::calendar::{
    create_event_source, GoogleCalendarSource, GoogleCredentials, SeedDataSource,
};
