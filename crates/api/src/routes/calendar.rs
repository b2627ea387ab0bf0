//! Raw calendar event endpoints

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use steeple_core::RefreshReport;
use steeple_domain::{
    AnnotatedEvent, CacheRefreshRecord, InstanceMetadata, OverlayPatch, RefreshKind,
};

use super::{AppState, LimitQuery};
use crate::error::ApiResult;
use crate::utils::logging::logged;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendar/events", get(list_events))
        .route("/calendar/refresh", post(refresh))
        .route("/calendar/refresh-history", get(refresh_history))
        .route(
            "/calendar/events/{external_id}/metadata",
            get(instance_metadata).post(attach_instance_metadata),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    #[serde(default)]
    pub force_refresh: bool,
}

/// GET /calendar/events - cached occurrences with their overrides, refreshed
/// when stale or forced
async fn list_events(
    State(ctx): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Json<Vec<AnnotatedEvent>>> {
    logged("calendar::list_events", ctx.admin.annotated_events(query.force_refresh))
        .await
        .map(Json)
}

/// POST /calendar/refresh - operator-triggered refresh
async fn refresh(State(ctx): State<AppState>) -> ApiResult<Json<RefreshReport>> {
    logged("calendar::refresh", ctx.calendar.refresh(RefreshKind::Manual)).await.map(Json)
}

/// GET /calendar/refresh-history - newest refresh records first
async fn refresh_history(
    State(ctx): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<CacheRefreshRecord>>> {
    logged("calendar::refresh_history", ctx.calendar.recent_refreshes(query.limit()))
        .await
        .map(Json)
}

/// GET /calendar/events/{externalId}/metadata - one occurrence and its override
async fn instance_metadata(
    State(ctx): State<AppState>,
    Path(external_id): Path<String>,
) -> ApiResult<Json<AnnotatedEvent>> {
    logged("calendar::instance_metadata", ctx.admin.instance_metadata(&external_id))
        .await
        .map(Json)
}

/// POST /calendar/events/{externalId}/metadata - override one occurrence
async fn attach_instance_metadata(
    State(ctx): State<AppState>,
    Path(external_id): Path<String>,
    Json(patch): Json<OverlayPatch>,
) -> ApiResult<Json<InstanceMetadata>> {
    logged(
        "calendar::attach_instance_metadata",
        ctx.admin.attach_metadata_to_instance(&external_id, &patch),
    )
    .await
    .map(Json)
}
