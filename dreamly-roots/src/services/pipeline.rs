//! Dream root-word pipeline
//!
//! Idle → RootsExtracted → RootsTranslated → EmojisResolved → Persisted
//!
//! Only extraction failures abort a run. Translation and per-root emoji
//! resolution degrade to local fallbacks; the map ingest notification is
//! fire-and-forget.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::db::dreams::{DreamEmoji, DreamStore, RootsUpdate};
use crate::icons::pick_dream_icons;
use crate::services::emoji_resolver::EmojiResolver;
use crate::services::map_ingest::{MapIngestEvent, MapIngestSink};
use crate::services::root_extractor::{ExtractionFailure, RootExtractor};
use crate::services::root_translator::RootTranslator;
use crate::text::{guess_language, normalize, ConceptLexicon, Language};

/// Output cardinality for one dream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DesiredCounts {
    pub roots: usize,
    pub emojis: usize,
    pub icons: usize,
}

/// Longer dreams get more roots, emojis and icons
pub fn desired_counts(text: &str) -> DesiredCounts {
    let words = text.split_whitespace().count();
    let chars = text.trim().chars().count();

    let (roots, emojis, icons) = if words <= 12 || chars <= 80 {
        (2, 1, 1)
    } else if words <= 25 || chars <= 160 {
        (3, 2, 2)
    } else if words <= 55 || chars <= 320 {
        (5, 4, 3)
    } else {
        (6, 5, 4)
    };

    DesiredCounts { roots, emojis, icons }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    RootsExtracted,
    RootsTranslated,
    EmojisResolved,
    Persisted,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No roots found")]
    NoRoots,

    #[error("Dream not found: {0}")]
    DreamNotFound(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),

    #[error(transparent)]
    Store(#[from] dreamly_common::Error),
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDream {
    pub roots: Vec<String>,
    pub roots_en: Vec<String>,
    pub roots_lang: String,
    pub emojis: Vec<DreamEmoji>,
    pub icons_en: Vec<String>,
    pub counts: DesiredCounts,
    pub stage: PipelineStage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    AlreadyProcessed,
    Processed(ProcessedDream),
}

pub struct DreamPipeline {
    store: Arc<dyn DreamStore>,
    extractor: Arc<RootExtractor>,
    translator: Arc<RootTranslator>,
    resolver: Arc<EmojiResolver>,
    lexicon: Arc<ConceptLexicon>,
    map_sink: Arc<dyn MapIngestSink>,
}

impl DreamPipeline {
    pub fn new(
        store: Arc<dyn DreamStore>,
        extractor: Arc<RootExtractor>,
        translator: Arc<RootTranslator>,
        resolver: Arc<EmojiResolver>,
        lexicon: Arc<ConceptLexicon>,
        map_sink: Arc<dyn MapIngestSink>,
    ) -> Self {
        Self {
            store,
            extractor,
            translator,
            resolver,
            lexicon,
            map_sink,
        }
    }

    pub async fn process_dream(
        &self,
        user_id: &str,
        dream_id: &str,
    ) -> Result<PipelineOutcome, PipelineError> {
        let dream = self
            .store
            .get_dream(user_id, dream_id)
            .await?
            .ok_or_else(|| PipelineError::DreamNotFound(format!("{}/{}", user_id, dream_id)))?;

        if dream.is_processed() {
            tracing::debug!(user_id = %user_id, dream_id = %dream_id, "Dream already processed");
            return Ok(PipelineOutcome::AlreadyProcessed);
        }

        let text = dream.text.trim();
        if text.is_empty() {
            return Err(PipelineError::InvalidInput("dream text is empty".to_string()));
        }

        if normalize(text, guess_language(text), &self.lexicon).is_empty() {
            tracing::info!(dream_id = %dream_id, "Dream text has no content words");
            return Err(PipelineError::NoRoots);
        }

        let counts = desired_counts(text);

        let extracted = self.extractor.extract_roots(text).await?;
        let language = extracted.language;
        tracing::debug!(dream_id = %dream_id, stage = ?PipelineStage::RootsExtracted, "Pipeline stage");

        let roots_en = self.translator.translate_roots(&extracted.roots, language).await;
        tracing::debug!(dream_id = %dream_id, stage = ?PipelineStage::RootsTranslated, "Pipeline stage");

        let roots: Vec<String> = extracted.roots.iter().take(counts.roots).cloned().collect();
        let roots_en: Vec<String> = roots_en.into_iter().take(counts.roots).collect();
        if roots.is_empty() && roots_en.is_empty() {
            return Err(PipelineError::NoRoots);
        }

        let icons_en = self.pick_icons(&roots_en, counts.icons);

        // Per-root resolution is independent; a root without a result is omitted
        let resolved = join_all(
            roots_en
                .iter()
                .map(|root| self.resolver.resolve_root(root, Language::En)),
        )
        .await;
        let emojis: Vec<DreamEmoji> = resolved.into_iter().flatten().take(counts.emojis).collect();
        tracing::debug!(
            dream_id = %dream_id,
            stage = ?PipelineStage::EmojisResolved,
            emojis = emojis.len(),
            "Pipeline stage"
        );

        let update = RootsUpdate {
            roots,
            roots_en,
            roots_lang: language.code().to_string(),
            emojis,
            icons_en,
        };
        self.store.save_roots(user_id, dream_id, &update).await?;

        self.map_sink.publish(MapIngestEvent {
            user_id: user_id.to_string(),
            dream_id: dream_id.to_string(),
        });

        tracing::info!(
            user_id = %user_id,
            dream_id = %dream_id,
            lang = language.code(),
            roots = update.roots.len(),
            emojis = update.emojis.len(),
            icons = update.icons_en.len(),
            "Dream roots persisted"
        );

        Ok(PipelineOutcome::Processed(ProcessedDream {
            roots: update.roots,
            roots_en: update.roots_en,
            roots_lang: update.roots_lang,
            emojis: update.emojis,
            icons_en: update.icons_en,
            counts,
            stage: PipelineStage::Persisted,
        }))
    }

    /// Icons from the normalized English roots
    fn pick_icons(&self, roots_en: &[String], max: usize) -> Vec<String> {
        let joined = roots_en.join(" ");
        let tokens = normalize(&joined, Language::En, &self.lexicon);
        let text = if tokens.is_empty() { joined } else { tokens.join(" ") };

        pick_dream_icons(&text, max)
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}
