//! dreamly-roots library interface
//!
//! Exposes the pipeline, its components and the HTTP router for the binary
//! and for integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod emoji;
pub mod error;
pub mod icons;
pub mod services;
pub mod text;

pub use crate::error::{ApiError, ApiJson, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::db::dreams::{DreamStore, SqliteDreamStore};
use crate::emoji::{CandidateScorer, EmojiIndex, OverrideCache, ScoringWeights};
use crate::services::{
    CityRef, DreamAnalyzer, DreamPipeline, EmojiPicker, EmojiResolver, LanguageModel,
    MapIngestSink, MapIngestor, MapboxGeocoder, RootExtractor, RootTranslator,
};
use crate::text::ConceptLexicon;

/// Collaborators an `AppState` is assembled from
pub struct AppServices {
    /// Extraction, translation and emoji picks
    pub model: Arc<dyn LanguageModel>,
    pub analysis_model: Arc<dyn LanguageModel>,
    /// An API key was resolved for the hosted model
    pub model_configured: bool,
    pub index: Arc<EmojiIndex>,
    pub lexicon: Arc<ConceptLexicon>,
    pub scoring: ScoringWeights,
    pub city: CityRef,
    pub geocoder: Option<Arc<MapboxGeocoder>>,
    pub map_sink: Arc<dyn MapIngestSink>,
    pub admin_token: Option<String>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub store: Arc<dyn DreamStore>,
    pub extractor: Arc<RootExtractor>,
    pub translator: Arc<RootTranslator>,
    pub picker: Arc<EmojiPicker>,
    pub analyzer: Arc<DreamAnalyzer>,
    pub resolver: Arc<EmojiResolver>,
    pub pipeline: Arc<DreamPipeline>,
    pub index: Arc<EmojiIndex>,
    pub overrides: Arc<OverrideCache>,
    pub map_ingestor: Arc<MapIngestor>,
    pub model_configured: bool,
    /// `/api/admin` bearer token; `None` leaves admin routes open
    pub admin_token: Option<Arc<str>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, services: AppServices) -> Self {
        let store: Arc<dyn DreamStore> = Arc::new(SqliteDreamStore::new(db.clone()));
        let overrides = Arc::new(OverrideCache::new());

        let extractor = Arc::new(RootExtractor::new(services.model.clone()));
        let translator = Arc::new(RootTranslator::new(services.model.clone()));
        let picker = Arc::new(EmojiPicker::new(services.model.clone()));
        let analyzer = Arc::new(DreamAnalyzer::new(services.analysis_model));

        let resolver = Arc::new(EmojiResolver::new(
            services.index.clone(),
            CandidateScorer::new(services.scoring),
            overrides.clone(),
            services.lexicon.clone(),
            picker.clone(),
        ));

        let pipeline = Arc::new(DreamPipeline::new(
            store.clone(),
            extractor.clone(),
            translator.clone(),
            resolver.clone(),
            services.lexicon,
            services.map_sink,
        ));

        let map_ingestor = Arc::new(
            MapIngestor::new(db.clone(), store.clone(), services.city)
                .with_geocoder(services.geocoder),
        );

        Self {
            db,
            store,
            extractor,
            translator,
            picker,
            analyzer,
            resolver,
            pipeline,
            index: services.index,
            overrides,
            map_ingestor,
            model_configured: services.model_configured,
            admin_token: services
                .admin_token
                .filter(|t| !t.trim().is_empty())
                .map(|t| Arc::from(t.trim())),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Record a failure for `/health`
    pub async fn set_last_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::dream_routes())
        .merge(api::map_routes())
        .merge(api::shared_routes())
        .merge(api::admin_routes(state.clone()))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
