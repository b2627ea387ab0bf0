//! HTTP error mapping
//!
//! Every handler returns [`ApiResult`]; domain errors become a status code
//! and a `{ "error": { "type", "message" } }` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use steeple_domain::SteepleError;
use tracing::error;

/// Domain error on its way out of a handler
#[derive(Debug)]
pub struct ApiError(pub SteepleError);

/// Result type for route handlers
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match &self.0 {
            SteepleError::PatternNotFound(_) | SteepleError::NotFound(_) => StatusCode::NOT_FOUND,
            SteepleError::InvalidReference(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SteepleError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SteepleError::UpstreamUnavailable(_) | SteepleError::UpstreamMalformed(_) => {
                StatusCode::BAD_GATEWAY
            }
            SteepleError::Database(_) | SteepleError::Config(_) | SteepleError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<SteepleError> for ApiError {
    fn from(err: SteepleError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error_type = self.0.label(), error = %self.0, "request failed");
        }

        // SteepleError serializes as { "type": <variant>, "message": <detail> }
        (status, Json(json!({ "error": self.0 }))).into_response()
    }
}
