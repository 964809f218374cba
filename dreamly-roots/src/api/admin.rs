//! Admin endpoints: emoji overrides, search hints, settings
//!
//! Every write refreshes the override cache, so the next pipeline run sees it.
//! When an admin token is configured all routes require
//! `Authorization: Bearer <token>`.

use axum::{
    extract::{Path, Query, Request, State},
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::Response,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::info;

use crate::db::{hints, overrides, settings};
use crate::emoji::{EmojiCandidate, EmojiOverride};
use crate::icons::is_known_icon;
use crate::services::CityRef;
use crate::text::guess_language;
use crate::{ApiError, ApiJson, ApiResult, AppState};

/// Results listed by the raw index search
const MAX_SEARCH_RESULTS: usize = 50;

/// Bearer token check for `/api/admin`
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match presented {
        Some(token) if token_matches(token, expected) => Ok(next.run(request).await),
        _ => Err(ApiError::Unauthorized),
    }
}

/// Compare fixed-length digests without an early exit
fn token_matches(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

async fn refresh_overrides(state: &AppState) -> ApiResult<()> {
    let count = state.overrides.refresh(&state.db).await?;
    info!(entries = count, "Override cache refreshed");
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideEntry {
    pub emoji_id: String,
    #[serde(flatten)]
    pub value: EmojiOverride,
}

/// GET /api/admin/emoji-overrides
pub async fn list_overrides(State(state): State<AppState>) -> ApiResult<Json<Vec<OverrideEntry>>> {
    let entries = overrides::list_overrides(&state.db)
        .await?
        .into_iter()
        .map(|(emoji_id, value)| OverrideEntry { emoji_id, value })
        .collect();
    Ok(Json(entries))
}

/// GET /api/admin/emoji-overrides/:id
pub async fn get_override(
    State(state): State<AppState>,
    Path(emoji_id): Path<String>,
) -> ApiResult<Json<OverrideEntry>> {
    overrides::get_override(&state.db, &emoji_id)
        .await?
        .map(|value| Json(OverrideEntry { emoji_id: emoji_id.clone(), value }))
        .ok_or_else(|| ApiError::NotFound(format!("override {}", emoji_id)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOverrideResponse {
    pub emoji_id: String,
    /// `None` when the override normalized to nothing and was removed
    pub value: Option<EmojiOverride>,
}

/// PUT /api/admin/emoji-overrides/:id
///
/// **Request:** `{"name"?, "keywords"?, "iconKey"?}`; an all-empty body removes the override
///
/// **Errors:**
/// - 400 Bad Request: `iconKey` is not a dream icon
/// - 404 Not Found: `id` is not in the emoji index
pub async fn save_override(
    State(state): State<AppState>,
    Path(emoji_id): Path<String>,
    ApiJson(payload): ApiJson<EmojiOverride>,
) -> ApiResult<Json<SaveOverrideResponse>> {
    let icon_key = payload
        .icon_key
        .as_deref()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty());
    if let Some(key) = icon_key {
        if !is_known_icon(&key) {
            return Err(ApiError::BadRequest(format!("Unknown icon key: {}", key)));
        }
    }

    state
        .index
        .ensure_ready()
        .await
        .map_err(|e| ApiError::Internal(format!("Emoji index unavailable: {}", e)))?;
    if state.index.get(emoji_id.trim()).is_none() {
        return Err(ApiError::NotFound(format!("emoji {}", emoji_id)));
    }

    let value = overrides::save_override(&state.db, &emoji_id, &payload).await?;
    refresh_overrides(&state).await?;

    info!(emoji_id = %emoji_id, removed = value.is_none(), "Emoji override saved");
    Ok(Json(SaveOverrideResponse { emoji_id, value }))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// DELETE /api/admin/emoji-overrides/:id
pub async fn delete_override(
    State(state): State<AppState>,
    Path(emoji_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = overrides::delete_override(&state.db, &emoji_id).await?;
    if deleted {
        refresh_overrides(&state).await?;
    }
    Ok(Json(DeleteResponse { deleted }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HintsBody {
    #[serde(default)]
    pub hints: BTreeMap<String, String>,
}

/// GET /api/admin/emoji-hints
pub async fn get_hints(State(state): State<AppState>) -> ApiResult<Json<HintsBody>> {
    let hints = hints::list_hints(&state.db).await?.into_iter().collect();
    Ok(Json(HintsBody { hints }))
}

/// PUT /api/admin/emoji-hints
///
/// Replaces the whole hint map; keys and phrases are lowercased, blanks dropped.
pub async fn put_hints(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<HintsBody>,
) -> ApiResult<Json<HintsBody>> {
    let count = hints::replace_hints(&state.db, &payload.hints).await?;
    refresh_overrides(&state).await?;

    info!(hints = count, "Emoji hints replaced");
    Ok(Json(HintsBody {
        hints: hints::normalize_hints(&payload.hints),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub native: String,
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    pub overridden: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    /// Raw index hits with effective metadata
    pub results: Vec<SearchHit>,
    /// What the pipeline would rank for `query` as a root
    pub ranked: Vec<EmojiCandidate>,
}

/// GET /api/admin/emoji-search?q=
pub async fn search_emojis(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let q = query.q.trim().to_lowercase();
    if q.is_empty() {
        return Err(ApiError::BadRequest("Missing q".to_string()));
    }

    state
        .index
        .ensure_ready()
        .await
        .map_err(|e| ApiError::Internal(format!("Emoji index unavailable: {}", e)))?;

    let snapshot = state.overrides.snapshot().await;
    let results = state
        .index
        .search(&q)
        .into_iter()
        .take(MAX_SEARCH_RESULTS)
        .map(|record| SearchHit {
            name: snapshot.effective_name(&record).to_string(),
            keywords: snapshot.effective_keywords(&record).to_vec(),
            overridden: snapshot.get(&record.id).is_some(),
            native: record.native.clone(),
            id: record.id.clone(),
        })
        .collect();

    let ranked = state.resolver.rank_candidates(&q, guess_language(&q)).await;

    Ok(Json(SearchResponse {
        query: q,
        results,
        ranked,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    #[serde(default)]
    pub model_api_key: Option<String>,
    #[serde(default)]
    pub default_city: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub success: bool,
    pub message: String,
}

/// PUT /api/admin/settings
///
/// **Request:** `{"modelApiKey"?, "defaultCity"?}` (`defaultCity` as `country|admin1|city`)
///
/// Values are stored in the database, the highest-priority source; they take
/// effect on the next service start.
pub async fn put_settings(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SettingsRequest>,
) -> ApiResult<Json<SettingsResponse>> {
    if payload.model_api_key.is_none() && payload.default_city.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }

    let city = match payload.default_city.as_deref() {
        Some(raw) => Some(
            CityRef::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid city id '{}'", raw)))?,
        ),
        None => None,
    };

    if let Some(key) = payload.model_api_key {
        if !crate::config::is_valid_key(&key) {
            return Err(ApiError::BadRequest(
                "API key cannot be empty or whitespace-only".to_string(),
            ));
        }
        settings::set_model_api_key(&state.db, key.trim().to_string()).await?;
        info!("Model API key stored in database");
    }

    if let Some(city) = city {
        settings::set_default_city(&state.db, city.id()).await?;
        info!(city = %city.id(), "Default city stored in database");
    }

    Ok(Json(SettingsResponse {
        success: true,
        message: "Settings saved; restart the service to apply".to_string(),
    }))
}

/// Build admin routes, guarded by `require_admin`
pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/admin/emoji-overrides", get(list_overrides))
        .route(
            "/api/admin/emoji-overrides/:id",
            get(get_override).put(save_override).delete(delete_override),
        )
        .route("/api/admin/emoji-hints", get(get_hints).put(put_hints))
        .route("/api/admin/emoji-search", get(search_emojis))
        .route("/api/admin/settings", put(put_settings))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}
