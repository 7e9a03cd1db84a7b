//! Generation handlers.

use axum::extract::State;
use axum::Json;
use axum_extra::extract::WithRejection;
use ck_models::{DescriptionRequest, ScriptRequest, ThumbnailRequest, TitleRequest};

use crate::auth::CallerContext;
use crate::error::{ApiError, ApiResult};
use crate::services::GenerationResponse;
use crate::state::AppState;

/// POST /api/ai/generate-titles
pub async fn generate_titles(
    State(state): State<AppState>,
    caller: CallerContext,
    WithRejection(Json(req), _): WithRejection<Json<TitleRequest>, ApiError>,
) -> ApiResult<Json<GenerationResponse>> {
    state.generation.titles(&caller, req).await.map(Json)
}

/// POST /api/ai/generate-description
pub async fn generate_description(
    State(state): State<AppState>,
    caller: CallerContext,
    WithRejection(Json(req), _): WithRejection<Json<DescriptionRequest>, ApiError>,
) -> ApiResult<Json<GenerationResponse>> {
    state.generation.description(&caller, req).await.map(Json)
}

/// POST /api/ai/generate-script
pub async fn generate_script(
    State(state): State<AppState>,
    caller: CallerContext,
    WithRejection(Json(req), _): WithRejection<Json<ScriptRequest>, ApiError>,
) -> ApiResult<Json<GenerationResponse>> {
    state.generation.script(&caller, req).await.map(Json)
}

/// POST /api/ai/generate-thumbnail
pub async fn generate_thumbnail(
    State(state): State<AppState>,
    caller: CallerContext,
    WithRejection(Json(req), _): WithRejection<Json<ThumbnailRequest>, ApiError>,
) -> ApiResult<Json<GenerationResponse>> {
    state.generation.thumbnail(&caller, req).await.map(Json)
}
