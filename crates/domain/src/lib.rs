//! # Steeple Domain
//!
//! Business domain types and models for the Steeple calendar core.
//!
//! This crate contains:
//! - Calendar and recurring-pattern data types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Pure utilities (title normalisation, ministry tagging, composite keys)
//!
//! ## Architecture
//! - No dependencies on other Steeple crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::ministry::{infer_ministry_tag, MinistryTag};
pub use utils::title::{normalize_time, normalize_title};
