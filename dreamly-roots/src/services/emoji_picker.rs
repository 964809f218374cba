//! Model-assisted emoji pick
//!
//! The model chooses one glyph from a bounded candidate list. Its answer is only
//! accepted when the glyph exactly matches a submitted candidate; anything else
//! falls back to the first (best-ranked) candidate.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::emoji::EmojiCandidate;
use crate::services::model_client::{LanguageModel, StructuredRequest};
use crate::text::coerce_string;

/// Candidates submitted to the model
pub const MAX_PICK_CANDIDATES: usize = 20;

/// Keywords sent per candidate
pub const MAX_PICK_KEYWORDS: usize = 12;

pub const FALLBACK_REASON: &str = "fallback_first_candidate";

const INSTRUCTION: &str = "Pick the best semantic match for this root word for a dream-journal UI. \
Prefer concrete, non-abstract, non-flag emojis. Choose exactly one.";

/// Candidate as submitted by a client or produced by the scorer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickCandidate {
    #[serde(default)]
    pub native: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl PickCandidate {
    /// Lenient read of a client-supplied candidate; scalar fields are coerced,
    /// anything else reads as empty
    pub fn from_value(value: &Value) -> Self {
        let field = |key: &str| value.get(key).map(coerce_string).unwrap_or_default();
        let keywords = match value.get("keywords") {
            Some(Value::Array(items)) => items
                .iter()
                .map(coerce_string)
                .filter(|k| !k.is_empty())
                .collect(),
            _ => Vec::new(),
        };

        Self {
            native: field("native"),
            id: field("id"),
            name: field("name"),
            keywords,
        }
    }
}

/// Candidates from a request body; a non-array value means none
pub fn candidates_from_value(value: &Value) -> Vec<PickCandidate> {
    match value {
        Value::Array(items) => items.iter().map(PickCandidate::from_value).collect(),
        _ => Vec::new(),
    }
}

impl From<&EmojiCandidate> for PickCandidate {
    fn from(c: &EmojiCandidate) -> Self {
        Self {
            native: c.native.clone(),
            id: c.id.clone(),
            name: c.name.clone(),
            keywords: c.keywords.clone(),
        }
    }
}

/// Chosen emoji
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickedEmoji {
    pub native: String,
    pub id: String,
    pub name: String,
    pub reason: String,
}

impl PickedEmoji {
    pub fn is_fallback(&self) -> bool {
        self.reason == FALLBACK_REASON
    }

    fn from_candidate(c: &PickCandidate, reason: impl Into<String>) -> Self {
        Self {
            native: c.native.clone(),
            id: c.id.clone(),
            name: c.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Trim, drop empty glyphs, dedup by glyph (first wins), cap
pub fn prepare_candidates(candidates: &[PickCandidate]) -> Vec<PickCandidate> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter_map(|c| {
            let native = c.native.trim();
            if native.is_empty() || !seen.insert(native.to_string()) {
                return None;
            }
            Some(PickCandidate {
                native: native.to_string(),
                id: c.id.trim().to_string(),
                name: c.name.trim().to_string(),
                keywords: c.keywords.iter().take(MAX_PICK_KEYWORDS).cloned().collect(),
            })
        })
        .take(MAX_PICK_CANDIDATES)
        .collect()
}

fn pick_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "native": { "type": "string" },
            "id": { "type": "string" },
            "name": { "type": "string" },
            "reason": { "type": "string" }
        },
        "required": ["native", "id", "name", "reason"]
    })
}

/// Emoji pick client
pub struct EmojiPicker {
    model: Arc<dyn LanguageModel>,
}

impl EmojiPicker {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Pick one candidate; `None` only when no valid candidate remains
    pub async fn pick_one(
        &self,
        root: &str,
        language: &str,
        candidates: &[PickCandidate],
    ) -> Option<PickedEmoji> {
        let prepared = prepare_candidates(candidates);
        let first = prepared.first()?;

        let language = if language.trim().is_empty() {
            "unknown"
        } else {
            language.trim()
        };
        let prompt = json!({
            "root": root,
            "lang": language,
            "instruction": INSTRUCTION,
            "candidates": prepared,
        });
        let user = format!(
            "You pick the single best emoji from the provided candidate list.\n\
             You MUST choose ONLY from the candidates.\n\
             Return valid JSON matching the schema.\n\n{}",
            serde_json::to_string_pretty(&prompt).unwrap_or_default()
        );

        let payload = match self
            .model
            .complete_json(StructuredRequest {
                name: "emoji_pick".to_string(),
                system: None,
                user,
                schema: pick_schema(),
                temperature: Some(0.2),
            })
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(root = %root, error = %e, "Emoji pick failed, using first candidate");
                return Some(PickedEmoji::from_candidate(first, FALLBACK_REASON));
            }
        };

        validate_pick(&prepared, &payload)
    }
}

/// Accept the model's glyph only if it was submitted, else the first candidate
pub fn validate_pick(prepared: &[PickCandidate], payload: &Value) -> Option<PickedEmoji> {
    let native = payload.get("native").map(coerce_string).unwrap_or_default();

    match prepared.iter().find(|c| c.native == native) {
        Some(found) => {
            let reason = payload.get("reason").map(coerce_string).unwrap_or_default();
            Some(PickedEmoji::from_candidate(found, reason))
        }
        None => {
            tracing::debug!(native = %native, "Model picked a glyph outside the candidate set");
            prepared
                .first()
                .map(|first| PickedEmoji::from_candidate(first, FALLBACK_REASON))
        }
    }
}
