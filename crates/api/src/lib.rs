//! # Steeple API
//!
//! HTTP application layer - routes and main entry point.
//!
//! This crate contains:
//! - axum routes (JSON, camelCase)
//! - Application context (dependency injection)
//! - Tracing setup and health reporting
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture
//! - Maps domain errors to HTTP status codes

pub mod context;
pub mod error;
pub mod routes;
pub mod utils;

// Re-export for convenience
pub use context::AppContext;
pub use error::{ApiError, ApiResult};
pub use routes::build_router;
