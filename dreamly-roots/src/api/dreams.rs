//! Dream endpoints
//!
//! Stateless pipeline steps (`/api/dreams/*`) and per-user dream documents
//! (`/api/users/:uid/dreams/*`), including soft delete and sharing.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::db::dreams::DreamRecord;
use crate::services::pipeline::PipelineOutcome;
use crate::services::{candidates_from_value, DreamAnalysis, PickedEmoji};
use crate::text::{coerce_string, Language};
use crate::{ApiError, ApiJson, ApiResult, AppState};

/// `{text}` body; `text` may be missing or of any JSON type
#[derive(Debug, Default, Deserialize)]
pub struct DreamTextRequest {
    #[serde(default)]
    pub text: Value,
    #[serde(default)]
    pub lang: Value,
}

impl DreamTextRequest {
    fn text(&self) -> ApiResult<String> {
        let text = coerce_string(&self.text);
        if text.is_empty() {
            return Err(ApiError::BadRequest("Missing text".to_string()));
        }
        Ok(text)
    }

    fn language(&self) -> Option<Language> {
        Some(Language::from_code(&coerce_string(&self.lang)))
            .filter(|l| *l != Language::Unknown)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootWordsResponse {
    pub lang: Language,
    pub roots: Vec<String>,
    pub roots_en: Vec<String>,
    pub core: Vec<String>,
    pub support: Vec<String>,
    pub themes: Vec<String>,
}

/// POST /api/dreams/rootwords
///
/// **Request:** `{"text": "..."}`
/// **Response:** `{"lang", "roots", "rootsEn", "core", "support", "themes"}`
///
/// **Errors:**
/// - 400 Bad Request: missing or empty text (no model call)
/// - 500 Internal Server Error: extraction failure
pub async fn extract_root_words(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<DreamTextRequest>,
) -> ApiResult<Json<RootWordsResponse>> {
    let text = payload.text()?;

    let extracted = match state.extractor.extract_roots(&text).await {
        Ok(extracted) => extracted,
        Err(e) => {
            state.set_last_error(e.to_string()).await;
            return Err(e.into());
        }
    };
    let roots_en = state
        .translator
        .translate_roots(&extracted.roots, extracted.language)
        .await;

    Ok(Json(RootWordsResponse {
        lang: extracted.language,
        roots: extracted.roots,
        roots_en,
        core: extracted.core,
        support: extracted.support,
        themes: extracted.themes,
    }))
}

/// `{root, lang?, candidates}`; every field is read leniently
#[derive(Debug, Deserialize)]
pub struct EmojiPickRequest {
    #[serde(default)]
    pub root: Value,
    #[serde(default)]
    pub lang: Value,
    #[serde(default)]
    pub candidates: Value,
}

/// POST /api/dreams/emoji-pick
///
/// **Request:** `{"root": "...", "lang": "en", "candidates": [{native, id, name, keywords}]}`
/// **Response:** `{"native", "id", "name", "reason"}`; the glyph is always one of the
/// submitted candidates
///
/// A missing `lang` is sent to the model as `unknown`.
///
/// **Errors:**
/// - 400 Bad Request: missing root, missing candidates, or no valid candidate
pub async fn pick_emoji(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EmojiPickRequest>,
) -> ApiResult<Json<PickedEmoji>> {
    let root = coerce_string(&payload.root);
    if root.is_empty() {
        return Err(ApiError::BadRequest("Missing root".to_string()));
    }
    let candidates = candidates_from_value(&payload.candidates);
    if candidates.is_empty() {
        return Err(ApiError::BadRequest("Missing candidates".to_string()));
    }

    let lang = Some(coerce_string(&payload.lang))
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| Language::Unknown.code().to_string());

    state
        .picker
        .pick_one(&root, &lang, &candidates)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::BadRequest("No valid candidates".to_string()))
}

/// POST /api/dreams/analyze
///
/// **Request:** `{"text": "...", "lang": "ru"}` (`lang` optional)
/// **Response:** `{"analysis", "model"}`
pub async fn analyze_text(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<DreamTextRequest>,
) -> ApiResult<Json<DreamAnalysis>> {
    let text = payload.text()?;
    let analysis = state.analyzer.analyze(&text, payload.language()).await?;
    Ok(Json(analysis))
}

/// POST /api/users/:uid/dreams
pub async fn create_dream(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(payload): ApiJson<DreamTextRequest>,
) -> ApiResult<(StatusCode, Json<DreamRecord>)> {
    let text = payload.text()?;
    let dream = state.store.create_dream(&user_id, &text).await?;

    info!(user_id = %user_id, dream_id = %dream.dream_id, "Dream created");
    Ok((StatusCode::CREATED, Json(dream)))
}

/// GET /api/users/:uid/dreams/:id
pub async fn get_dream(
    State(state): State<AppState>,
    Path((user_id, dream_id)): Path<(String, String)>,
) -> ApiResult<Json<DreamRecord>> {
    state
        .store
        .get_dream(&user_id, &dream_id)
        .await?
        .filter(|dream| !dream.deleted)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("dream {}/{}", user_id, dream_id)))
}

#[derive(Debug, Serialize)]
pub struct DreamListResponse {
    pub dreams: Vec<DreamRecord>,
}

/// GET /api/users/:uid/dreams
///
/// **Response:** `{"dreams": [...]}`, newest first, deleted dreams omitted
pub async fn list_dreams(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<DreamListResponse>> {
    let dreams = state.store.list_dreams(&user_id).await?;
    Ok(Json(DreamListResponse { dreams }))
}

/// DELETE /api/users/:uid/dreams/:id
///
/// Soft delete; a shared copy leaves the feed in the same transaction.
pub async fn delete_dream(
    State(state): State<AppState>,
    Path((user_id, dream_id)): Path<(String, String)>,
) -> ApiResult<Json<DreamRecord>> {
    let dream = state.store.soft_delete_dream(&user_id, &dream_id).await?;
    info!(user_id = %user_id, dream_id = %dream_id, "Dream deleted");
    Ok(Json(dream))
}

/// POST /api/users/:uid/dreams/:id/share
pub async fn share_dream(
    State(state): State<AppState>,
    Path((user_id, dream_id)): Path<(String, String)>,
) -> ApiResult<Json<DreamRecord>> {
    let dream = state.store.share_dream(&user_id, &dream_id).await?;
    info!(user_id = %user_id, dream_id = %dream_id, "Dream shared");
    Ok(Json(dream))
}

/// DELETE /api/users/:uid/dreams/:id/share
pub async fn unshare_dream(
    State(state): State<AppState>,
    Path((user_id, dream_id)): Path<(String, String)>,
) -> ApiResult<Json<DreamRecord>> {
    let dream = state.store.unshare_dream(&user_id, &dream_id).await?;
    info!(user_id = %user_id, dream_id = %dream_id, "Dream unshared");
    Ok(Json(dream))
}

/// POST /api/users/:uid/dreams/:id/roots
///
/// Runs the root-word pipeline; a dream that already has roots and visuals
/// answers `{"status": "already_processed"}` without any model call.
pub async fn process_dream_roots(
    State(state): State<AppState>,
    Path((user_id, dream_id)): Path<(String, String)>,
) -> ApiResult<Json<PipelineOutcome>> {
    match state.pipeline.process_dream(&user_id, &dream_id).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            let err: ApiError = e.into();
            if matches!(err, ApiError::Internal(_) | ApiError::Common(_)) {
                state.set_last_error(err.to_string()).await;
            }
            Err(err)
        }
    }
}

/// POST /api/users/:uid/dreams/:id/analyze
///
/// Analyzes the stored dream text and saves the result on the dream.
pub async fn analyze_dream(
    State(state): State<AppState>,
    Path((user_id, dream_id)): Path<(String, String)>,
) -> ApiResult<Json<DreamAnalysis>> {
    let dream = state
        .store
        .get_dream(&user_id, &dream_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("dream {}/{}", user_id, dream_id)))?;

    let language = dream
        .roots_lang
        .as_deref()
        .map(Language::from_code)
        .filter(|l| *l != Language::Unknown);
    let analysis = state.analyzer.analyze(&dream.text, language).await?;

    state
        .store
        .save_analysis(&user_id, &dream_id, &analysis.analysis, &analysis.model)
        .await?;

    Ok(Json(analysis))
}

/// Build dream routes
pub fn dream_routes() -> Router<AppState> {
    Router::new()
        .route("/api/dreams/rootwords", post(extract_root_words))
        .route("/api/dreams/emoji-pick", post(pick_emoji))
        .route("/api/dreams/analyze", post(analyze_text))
        .route("/api/users/:uid/dreams", get(list_dreams).post(create_dream))
        .route("/api/users/:uid/dreams/:id", get(get_dream).delete(delete_dream))
        .route(
            "/api/users/:uid/dreams/:id/share",
            post(share_dream).delete(unshare_dream),
        )
        .route("/api/users/:uid/dreams/:id/roots", post(process_dream_roots))
        .route("/api/users/:uid/dreams/:id/analyze", post(analyze_dream))
}
