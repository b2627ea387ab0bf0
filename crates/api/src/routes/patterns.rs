//! Recurring pattern endpoints and curated metadata writes

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use steeple_domain::{
    CompositeKeyInput, OrphanedOverlay, OverlayPatch, Partition, SteepleError, StoredPattern,
};

use super::{AppState, LimitQuery};
use crate::error::{ApiError, ApiResult};
use crate::utils::logging::logged;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recurring-patterns", get(list_patterns))
        .route("/recurring-patterns/featured", get(featured_patterns))
        .route("/recurring-patterns/lookup", get(lookup))
        .route("/recurring-patterns/refresh", post(refresh_current))
        .route("/recurring-patterns/metadata", post(attach_metadata))
        .route("/recurring-patterns/apply-to-series", post(apply_to_series))
        .route("/recurring-patterns/orphaned", get(orphaned))
}

/// `?month=&year=`; both omitted means the current month
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
    #[serde(default)]
    pub include_external: bool,
}

impl PartitionQuery {
    fn resolve(&self, ctx: &AppState) -> Result<(u32, i32), ApiError> {
        match (self.month, self.year) {
            (Some(month), Some(year)) => Ok((month, year)),
            (None, None) => {
                let Partition { month, year } = ctx.calendar.current_partition();
                Ok((month, year))
            }
            _ => Err(SteepleError::InvalidInput("month and year must be given together".into())
                .into()),
        }
    }
}

/// Body of the pattern metadata writes: the composite key plus the patch
#[derive(Debug, Deserialize)]
pub struct PatternMetadataRequest {
    #[serde(flatten)]
    pub key: CompositeKeyInput,
    #[serde(flatten)]
    pub patch: OverlayPatch,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyToSeriesResponse {
    pub updated_count: usize,
}

/// GET /recurring-patterns - a month's patterns, external ones on request
async fn list_patterns(
    State(ctx): State<AppState>,
    Query(query): Query<PartitionQuery>,
) -> ApiResult<Json<Vec<StoredPattern>>> {
    let (month, year) = query.resolve(&ctx)?;
    logged(
        "recurring_patterns::list",
        ctx.calendar.get_patterns(month, year, query.include_external),
    )
    .await
    .map(Json)
}

/// GET /recurring-patterns/featured - public home-page patterns not yet ended
async fn featured_patterns(
    State(ctx): State<AppState>,
    Query(query): Query<PartitionQuery>,
) -> ApiResult<Json<Vec<StoredPattern>>> {
    let (month, year) = query.resolve(&ctx)?;
    logged("recurring_patterns::featured", ctx.calendar.featured_patterns(month, year))
        .await
        .map(Json)
}

/// GET /recurring-patterns/lookup - best match in the current month
async fn lookup(
    State(ctx): State<AppState>,
    Query(key): Query<CompositeKeyInput>,
) -> ApiResult<Json<StoredPattern>> {
    let found = logged("recurring_patterns::lookup", ctx.calendar.find_by_composite_key(&key)).await?;
    found.map(Json).ok_or_else(|| {
        ApiError(SteepleError::NotFound(format!(
            "no pattern matches {} on day {} at {}",
            key.title, key.day_of_week, key.time
        )))
    })
}

/// POST /recurring-patterns/refresh - recompute the current month
async fn refresh_current(State(ctx): State<AppState>) -> ApiResult<Json<Vec<StoredPattern>>> {
    logged("recurring_patterns::refresh", ctx.calendar.refresh_current_partition()).await.map(Json)
}

/// POST /recurring-patterns/metadata - curate the current month's row
async fn attach_metadata(
    State(ctx): State<AppState>,
    Json(request): Json<PatternMetadataRequest>,
) -> ApiResult<Json<StoredPattern>> {
    logged(
        "recurring_patterns::attach_metadata",
        ctx.admin.attach_metadata(&request.key, &request.patch),
    )
    .await
    .map(Json)
}

/// POST /recurring-patterns/apply-to-series - curate every cached month
async fn apply_to_series(
    State(ctx): State<AppState>,
    Json(request): Json<PatternMetadataRequest>,
) -> ApiResult<Json<ApplyToSeriesResponse>> {
    let updated_count = logged(
        "recurring_patterns::apply_to_series",
        ctx.admin.apply_to_series(&request.key, &request.patch),
    )
    .await?;
    Ok(Json(ApplyToSeriesResponse { updated_count }))
}

/// GET /recurring-patterns/orphaned - archived overlays, newest first
async fn orphaned(
    State(ctx): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<OrphanedOverlay>>> {
    logged("recurring_patterns::orphaned", ctx.calendar.orphaned_overlays(query.limit()))
        .await
        .map(Json)
}
