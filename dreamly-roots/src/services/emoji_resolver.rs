//! Per-root emoji resolution
//!
//! hint → lexicon → normalize → index search → score/rank → model pick

use std::sync::Arc;

use crate::db::dreams::DreamEmoji;
use crate::emoji::{CandidateScorer, EmojiCandidate, EmojiIndex, OverrideCache, TokenHits};
use crate::services::emoji_picker::{EmojiPicker, PickCandidate};
use crate::text::{guess_language, normalize, ConceptLexicon, Language};

/// Tokens kept from a non-English root
const MAX_FOREIGN_TOKENS: usize = 6;

/// Resolves one root word to one emoji
pub struct EmojiResolver {
    index: Arc<EmojiIndex>,
    scorer: CandidateScorer,
    overrides: Arc<OverrideCache>,
    lexicon: Arc<ConceptLexicon>,
    picker: Arc<EmojiPicker>,
}

impl EmojiResolver {
    pub fn new(
        index: Arc<EmojiIndex>,
        scorer: CandidateScorer,
        overrides: Arc<OverrideCache>,
        lexicon: Arc<ConceptLexicon>,
        picker: Arc<EmojiPicker>,
    ) -> Self {
        Self {
            index,
            scorer,
            overrides,
            lexicon,
            picker,
        }
    }

    /// Untranslated roots keep their script even when the caller says English
    fn effective_language(root: &str, hint: Language) -> Language {
        match guess_language(root) {
            Language::Ru => Language::Ru,
            Language::He => Language::He,
            _ => hint,
        }
    }

    /// Ranked local candidates for a root, no model call
    pub async fn rank_candidates(&self, root: &str, language: Language) -> Vec<EmojiCandidate> {
        let overrides = self.overrides.snapshot().await;

        let phrase = overrides.hint_for(root).unwrap_or(root).to_string();
        let language = Self::effective_language(&phrase, language);

        let mut tokens = normalize(&phrase, language, &self.lexicon);
        if !language.is_english() {
            tokens.truncate(MAX_FOREIGN_TOKENS);
        }
        if tokens.is_empty() {
            // short or stop-word roots are searched whole
            let whole = phrase.trim().to_lowercase();
            if whole.is_empty() {
                return Vec::new();
            }
            tokens.push(whole);
        }

        if let Err(e) = self.index.ensure_ready().await {
            tracing::warn!(error = %e, "Emoji index unavailable");
            return Vec::new();
        }

        let hits: Vec<TokenHits> = tokens
            .iter()
            .map(|token| TokenHits {
                token: token.clone(),
                hits: self.index.search(token),
            })
            .collect();

        self.scorer.score_and_rank(&tokens, &hits, &overrides)
    }

    /// Best emoji for a root, `None` when nothing acceptable was found
    pub async fn resolve_root(&self, root: &str, language: Language) -> Option<DreamEmoji> {
        let candidates = self.rank_candidates(root, language).await;
        if candidates.is_empty() {
            tracing::debug!(root = %root, "No emoji candidates for root");
            return None;
        }

        let submitted: Vec<PickCandidate> = candidates.iter().map(PickCandidate::from).collect();
        let picked = self
            .picker
            .pick_one(root, language.code(), &submitted)
            .await?;

        tracing::debug!(root = %root, native = %picked.native, reason = %picked.reason, "Resolved root emoji");

        Some(DreamEmoji {
            native: picked.native,
            id: picked.id,
            name: picked.name,
        })
    }
}
