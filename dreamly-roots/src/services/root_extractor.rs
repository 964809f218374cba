//! Root word extraction
//!
//! Asks the hosted model for the symbolic structure of a dream (core roots,
//! support roots, themes) in the dream's own language, then sanitizes the
//! answer locally.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::services::model_client::{LanguageModel, ModelError, StructuredRequest};
use crate::text::{guess_language, sanitize_list, Language};

pub const MAX_CORE: usize = 6;
pub const MAX_SUPPORT: usize = 12;
pub const MAX_THEMES: usize = 5;
pub const MAX_ROOTS: usize = 12;

const SYSTEM_PROMPT: &str = "\
You are a symbolic dream analyzer.

Your task is NOT lemmatization.
Extract the CORE SYMBOLIC STRUCTURE of the dream.

OUTPUT (must match the provided JSON schema):
- lang: \"en\" | \"ru\" | \"he\" | \"unknown\"
- core: 4-6 most fundamental symbolic roots.
- support: 6-12 secondary supporting roots.
- themes: 3-5 short conceptual themes (1-3 words each).

CORE RULES:
1) Core symbols are the elements without which the dream loses its identity.
2) Prefer symbolic anchors over decorative scenery.
3) Include emotional or transformation elements if present.
4) Be highly selective. Fewer, stronger symbols are better.
5) Cover the whole dream (beginning, middle, ending).

SUPPORT RULES:
- Include meaningful objects, actions, atmosphere elements.
- Avoid generic filler words.

REMOVE: stop-words, numbers, emojis, proper names, generic adjectives unless they function as symbols.

LANGUAGE:
- Preserve the original language.
- Return the base lemma form.
- Do NOT translate.

Return only valid JSON.";

/// Extraction failures (always surfaced to the caller)
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("Dream text is empty")]
    EmptyText,

    #[error("Root extraction call failed: {0}")]
    Model(#[from] ModelError),

    #[error("Root extraction returned invalid payload: {0}")]
    Schema(String),
}

/// Sanitized extraction result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedRoots {
    #[serde(rename = "lang")]
    pub language: Language,
    pub core: Vec<String>,
    pub support: Vec<String>,
    pub themes: Vec<String>,
    /// core ++ support, deduplicated, core first
    pub roots: Vec<String>,
}

fn extraction_schema() -> Value {
    let string_array = json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "lang": { "type": "string" },
            "core": string_array,
            "support": string_array,
            "themes": string_array
        },
        "required": ["lang", "core", "support", "themes"]
    })
}

/// Root extraction client
pub struct RootExtractor {
    model: Arc<dyn LanguageModel>,
}

impl RootExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn extract_roots(&self, text: &str) -> Result<ExtractedRoots, ExtractionFailure> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractionFailure::EmptyText);
        }

        let payload = self
            .model
            .complete_json(StructuredRequest {
                name: "root_words".to_string(),
                system: Some(SYSTEM_PROMPT.to_string()),
                user: text.to_string(),
                schema: extraction_schema(),
                temperature: None,
            })
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Root extraction call failed");
                e
            })?;

        let extracted = parse_extraction(&payload, text)?;

        tracing::info!(
            lang = extracted.language.code(),
            core = extracted.core.len(),
            support = extracted.support.len(),
            themes = extracted.themes.len(),
            "Extracted dream roots"
        );

        Ok(extracted)
    }
}

fn required_array<'a>(payload: &'a Value, field: &str) -> Result<&'a Vec<Value>, ExtractionFailure> {
    payload
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| ExtractionFailure::Schema(format!("`{}` must be an array", field)))
}

/// Validate and sanitize a raw extraction payload
///
/// An empty or unrecognized `lang` falls back to the character-range guess on `text`.
pub fn parse_extraction(payload: &Value, text: &str) -> Result<ExtractedRoots, ExtractionFailure> {
    if !payload.is_object() {
        return Err(ExtractionFailure::Schema("payload is not an object".to_string()));
    }

    let lang = payload
        .get("lang")
        .and_then(Value::as_str)
        .ok_or_else(|| ExtractionFailure::Schema("`lang` must be a string".to_string()))?;

    let core = sanitize_list(required_array(payload, "core")?, MAX_CORE);
    let support = sanitize_list(required_array(payload, "support")?, MAX_SUPPORT);
    let themes = sanitize_list(required_array(payload, "themes")?, MAX_THEMES);

    let language = match Language::from_code(lang) {
        Language::Unknown => guess_language(text),
        known => known,
    };

    let roots = combine_roots(&core, &support);

    Ok(ExtractedRoots {
        language,
        core,
        support,
        themes,
        roots,
    })
}

/// core ++ support, case-insensitive dedup, capped with core first
pub fn combine_roots(core: &[String], support: &[String]) -> Vec<String> {
    let combined: Vec<Value> = core
        .iter()
        .chain(support.iter())
        .map(|s| Value::String(s.clone()))
        .collect();
    sanitize_list(&combined, MAX_ROOTS)
}
