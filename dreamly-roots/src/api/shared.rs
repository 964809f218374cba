//! Shared dream feed and reactions

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::shared::{self, ReactionKey, ReactionToggle, SharedDream};
use crate::text::coerce_string;
use crate::{ApiError, ApiJson, ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    /// Viewer; adds `myReactions` to each entry
    pub uid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub dreams: Vec<SharedDream>,
}

/// GET /api/shared?uid=
///
/// **Response:** `{"dreams": [...]}`, newest share first, at most 50
pub async fn list_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<FeedResponse>> {
    let viewer = query.uid.as_deref().map(str::trim).filter(|u| !u.is_empty());
    let dreams = shared::list_shared(&state.db, viewer).await?;
    Ok(Json(FeedResponse { dreams }))
}

/// `{uid, key}`; read leniently
#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    #[serde(default)]
    pub uid: Value,
    #[serde(default)]
    pub key: Value,
}

/// POST /api/shared/:id/reactions
///
/// **Request:** `{"uid": "...", "key": "heart" | "like" | "star"}`
/// **Response:** `{"sharedId", "key", "on", "reactions": {heart, like, star}}`
///
/// **Errors:**
/// - 400 Bad Request: missing uid or unknown key
/// - 404 Not Found: shared dream missing or withdrawn
pub async fn toggle_reaction(
    State(state): State<AppState>,
    Path(shared_id): Path<String>,
    ApiJson(payload): ApiJson<ReactionRequest>,
) -> ApiResult<Json<ReactionToggle>> {
    let user_id = coerce_string(&payload.uid);
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("Missing uid".to_string()));
    }
    let raw_key = coerce_string(&payload.key);
    let key = ReactionKey::parse(&raw_key)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown reaction: {}", raw_key)))?;

    let toggle = shared::toggle_reaction(
        &state.db,
        &shared_id,
        &user_id,
        key,
        Utc::now().timestamp_millis(),
    )
    .await?;
    Ok(Json(toggle))
}

/// Build shared feed routes
pub fn shared_routes() -> Router<AppState> {
    Router::new()
        .route("/api/shared", get(list_feed))
        .route("/api/shared/:id/reactions", post(toggle_reaction))
}
