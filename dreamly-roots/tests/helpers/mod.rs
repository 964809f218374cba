//! Test Helper Utilities
//!
//! Shared utilities for testing dreamly-roots
#![allow(dead_code)]

pub mod db_utils;
pub mod scripted_model;

// Re-export commonly used items
pub use db_utils::{create_memory_db, create_test_db, get_table_columns, has_column};
pub use scripted_model::{RecordingSink, ScriptedModel};

use std::sync::Arc;

use dreamly_roots::emoji::{EmojiIndex, ScoringWeights};
use dreamly_roots::services::CityRef;
use dreamly_roots::text::ConceptLexicon;
use dreamly_roots::{AppServices, AppState};

/// App state over an in-memory database, the bundled emoji dataset and a
/// scripted model
pub struct TestApp {
    pub state: AppState,
    pub model: Arc<ScriptedModel>,
    pub sink: Arc<RecordingSink>,
}

pub async fn test_app() -> TestApp {
    test_app_with_token(None).await
}

pub async fn test_app_with_token(admin_token: Option<&str>) -> TestApp {
    let db = create_memory_db().await;
    let model = Arc::new(ScriptedModel::new("scripted-model"));
    let sink = Arc::new(RecordingSink::default());

    let state = AppState::new(
        db,
        AppServices {
            model: model.clone(),
            analysis_model: model.clone(),
            model_configured: true,
            index: Arc::new(EmojiIndex::bundled()),
            lexicon: Arc::new(ConceptLexicon::bundled()),
            scoring: ScoringWeights::default(),
            city: CityRef::default(),
            geocoder: None,
            map_sink: sink.clone(),
            admin_token: admin_token.map(str::to_string),
        },
    );

    TestApp { state, model, sink }
}
