//! Map aggregation endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::map_stats::{self, CityStats, EmojiCount, IngestOutcome, Scope, ALL_TIME};
use crate::text::coerce_string;
use crate::{ApiError, ApiJson, ApiResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default)]
    pub uid: Value,
    #[serde(default)]
    pub dream_id: Value,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_key: Option<String>,
}

impl From<IngestOutcome> for IngestResponse {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Ingested { city_id, date_key } => Self {
                ok: true,
                city_id: Some(city_id),
                date_key: Some(date_key),
                ..Default::default()
            },
            IngestOutcome::Skipped { reason } => Self {
                ok: true,
                skipped: Some(true),
                reason,
                ..Default::default()
            },
        }
    }
}

/// POST /api/map/ingest-dream
///
/// **Request:** `{"uid": "...", "dreamId": "..."}`
/// **Response:** `{"ok": true, "cityId", "dateKey"}` or `{"ok": true, "skipped": true, "reason"?}`
///
/// Counting is exactly-once per dream; repeats answer `skipped`.
pub async fn ingest_dream(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<IngestRequest>,
) -> ApiResult<Json<IngestResponse>> {
    let user_id = coerce_string(&payload.uid);
    let dream_id = coerce_string(&payload.dream_id);
    if user_id.is_empty() || dream_id.is_empty() {
        return Err(ApiError::BadRequest("Missing uid or dreamId".to_string()));
    }

    let outcome = state.map_ingestor.ingest(&user_id, &dream_id).await?;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Serialize)]
pub struct CitiesResponse {
    pub cities: Vec<CityStats>,
}

/// GET /api/map/cities
pub async fn list_cities(State(state): State<AppState>) -> ApiResult<Json<CitiesResponse>> {
    let cities = map_stats::list_cities(&state.db).await?;
    Ok(Json(CitiesResponse { cities }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    pub user_id: String,
    pub total_dreams: i64,
    pub emojis: Vec<EmojiCount>,
}

/// GET /api/map/users/:uid
///
/// All-time dream total and glyph counts for one user.
pub async fn user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserStatsResponse>> {
    let total_dreams = map_stats::total_dreams(&state.db, Scope::User, &user_id, ALL_TIME).await?;
    let emojis = map_stats::emoji_counts(&state.db, Scope::User, &user_id, ALL_TIME).await?;

    Ok(Json(UserStatsResponse {
        user_id,
        total_dreams,
        emojis,
    }))
}

/// Build map routes
pub fn map_routes() -> Router<AppState> {
    Router::new()
        .route("/api/map/ingest-dream", post(ingest_dream))
        .route("/api/map/cities", get(list_cities))
        .route("/api/map/users/:uid", get(user_stats))
}
