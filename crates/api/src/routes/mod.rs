//! HTTP routes
//!
//! Query parameters and JSON bodies use camelCase.

pub mod calendar;
pub mod health;
pub mod patterns;

use std::sync::Arc;

use axum::Router;
use serde::Deserialize;
use steeple_domain::constants::DEFAULT_HISTORY_LIMIT;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Shared handler state
pub type AppState = Arc<AppContext>;

/// Build the application router with request tracing
pub fn build_router(ctx: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(calendar::router())
        .merge(patterns::router())
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
}

/// `?limit=` on history listings; the service clamps it
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)
    }
}
