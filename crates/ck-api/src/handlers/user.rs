//! User handlers: credits, dashboard and creation management.

use axum::extract::{Path, Query, State};
use axum::Json;
use axum_extra::extract::WithRejection;
use ck_models::{Balance, Creation, CreationSummary, Plan, PublishedCreation, INITIAL_FREE_CREDITS};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::CallerContext;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Dashboard page size.
const DASHBOARD_PAGE_SIZE: i64 = 10;

/// Parse a creation ID path segment. Malformed IDs cannot name a row.
fn parse_creation_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| ApiError::not_found(format!("creation {}", id)))
}

#[derive(Serialize)]
pub struct CreditsResponse {
    pub success: bool,
    pub remaining: Balance,
    pub plan: Plan,
}

/// GET /api/user/credits
pub async fn get_credits(
    State(state): State<AppState>,
    caller: CallerContext,
) -> ApiResult<Json<CreditsResponse>> {
    let remaining = state.credits.balance(&caller).await;

    Ok(Json(CreditsResponse {
        success: true,
        remaining,
        plan: caller.plan,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// Kept as text so that a malformed page falls back to the first page.
    pub page: Option<String>,
}

impl DashboardQuery {
    fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 0)
            .unwrap_or(0)
    }
}

#[derive(Serialize)]
pub struct Usage {
    pub used: i64,
    pub limit: i64,
    pub remaining: Balance,
}

impl From<Balance> for Usage {
    fn from(balance: Balance) -> Self {
        Self {
            used: balance.used(),
            limit: INITIAL_FREE_CREDITS,
            remaining: balance,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub success: bool,
    pub creations: Vec<CreationSummary>,
    pub total_creations: i64,
    pub plan: Plan,
    pub usage: Usage,
}

/// GET /api/user/get-dashboard-overview?page=N
pub async fn get_dashboard_overview(
    State(state): State<AppState>,
    caller: CallerContext,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<DashboardResponse>> {
    let offset = query.page().saturating_mul(DASHBOARD_PAGE_SIZE);

    let (creations, total, balance) = tokio::join!(
        state
            .creations
            .list_recent(&caller.caller_id, DASHBOARD_PAGE_SIZE, offset),
        state.creations.count_for_user(&caller.caller_id),
        state.credits.balance(&caller),
    );

    Ok(Json(DashboardResponse {
        success: true,
        creations: creations?,
        total_creations: total?,
        plan: caller.plan,
        usage: balance.into(),
    }))
}

#[derive(Serialize)]
pub struct CreationResponse {
    pub success: bool,
    pub creation: Creation,
}

/// GET /api/user/get-creation/:id
pub async fn get_creation(
    State(state): State<AppState>,
    caller: CallerContext,
    Path(id): Path<String>,
) -> ApiResult<Json<CreationResponse>> {
    let id = parse_creation_id(&id)?;

    let creation = state
        .creations
        .get_owned(id, &caller.caller_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("creation {}", id)))?;

    Ok(Json(CreationResponse {
        success: true,
        creation,
    }))
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// DELETE /api/user/delete-creation/:id
pub async fn delete_creation(
    State(state): State<AppState>,
    caller: CallerContext,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_creation_id(&id)?;

    if !state.creations.delete_owned(id, &caller.caller_id).await? {
        return Err(ApiError::not_found(format!("creation {}", id)));
    }

    info!(user_id = %caller.caller_id, creation_id = %id, "Deleted creation");

    Ok(Json(MessageResponse {
        success: true,
        message: "Deleted successfully".to_string(),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    pub is_published: bool,
}

/// POST /api/user/toggle-publish-creation/:id
pub async fn toggle_publish_creation(
    State(state): State<AppState>,
    caller: CallerContext,
    Path(id): Path<String>,
) -> ApiResult<Json<PublishResponse>> {
    let id = parse_creation_id(&id)?;

    let is_published = state
        .creations
        .toggle_publish(id, &caller.caller_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("creation {}", id)))?;

    Ok(Json(PublishResponse {
        success: true,
        is_published,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    #[serde(default)]
    pub id: String,
}

#[derive(Serialize)]
pub struct LikesResponse {
    pub success: bool,
    pub likes: Vec<String>,
}

/// POST /api/user/toggle-like-creation
pub async fn toggle_like_creation(
    State(state): State<AppState>,
    caller: CallerContext,
    WithRejection(Json(req), _): WithRejection<Json<LikeRequest>, ApiError>,
) -> ApiResult<Json<LikesResponse>> {
    let id = parse_creation_id(&req.id)?;

    let likes = state
        .creations
        .toggle_like(id, &caller.caller_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("creation {}", id)))?;

    Ok(Json(LikesResponse {
        success: true,
        likes,
    }))
}

#[derive(Serialize)]
pub struct PublishedResponse {
    pub success: bool,
    pub creations: Vec<PublishedCreation>,
}

/// GET /api/user/get-published-creations
pub async fn get_published_creations(
    State(state): State<AppState>,
    _caller: CallerContext,
) -> ApiResult<Json<PublishedResponse>> {
    let creations = state.creations.list_published().await?;

    Ok(Json(PublishedResponse {
        success: true,
        creations,
    }))
}
