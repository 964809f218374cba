//! Root word translation
//!
//! Translates non-English roots to English, index-aligned with the input.
//! Never fails outward: any problem yields the original roots unchanged.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::services::model_client::{LanguageModel, StructuredRequest};
use crate::text::{coerce_string, sanitize_root, Language};

const SYSTEM_PROMPT: &str = "\
You translate short dream symbol words into English.
Return exactly one English word or short phrase (1-3 words) per input line,
in the same order and the same count as the input.
Use base dictionary form. Do not add, merge, or skip items.
Return only valid JSON.";

fn translation_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "rootsEn": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["rootsEn"]
    })
}

/// Root translation client
pub struct RootTranslator {
    model: Arc<dyn LanguageModel>,
}

impl RootTranslator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// English roots aligned with `roots`, or `roots` itself on any failure
    pub async fn translate_roots(&self, roots: &[String], language: Language) -> Vec<String> {
        if roots.is_empty() || language.is_english() {
            return roots.to_vec();
        }

        let source = match language {
            Language::Unknown => "the source language".to_string(),
            other => other.display_name().to_string(),
        };

        let request = StructuredRequest {
            name: "roots_translation".to_string(),
            system: Some(SYSTEM_PROMPT.to_string()),
            user: format!(
                "Translate from {} to English ({} lines):\n{}",
                source,
                roots.len(),
                roots.join("\n")
            ),
            schema: translation_schema(),
            temperature: Some(0.0),
        };

        let payload = match self.model.complete_json(request).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Root translation failed, keeping original roots");
                return roots.to_vec();
            }
        };

        match align_translation(roots, &payload) {
            Some(translated) => {
                tracing::debug!(count = translated.len(), lang = language.code(), "Translated roots");
                translated
            }
            None => {
                tracing::warn!(
                    expected = roots.len(),
                    "Root translation incomplete, keeping original roots"
                );
                roots.to_vec()
            }
        }
    }
}

/// Align a `{rootsEn}` payload with `roots`
///
/// Returns `None` when fewer than `min(3, roots.len())` usable entries came back.
/// Empty or missing positions take the original root.
pub fn align_translation(roots: &[String], payload: &Value) -> Option<Vec<String>> {
    let items = payload.get("rootsEn")?.as_array()?;

    let translated: Vec<String> = (0..roots.len())
        .map(|i| {
            items
                .get(i)
                .map(|v| sanitize_root(&coerce_string(v)))
                .unwrap_or_default()
        })
        .collect();

    let usable = translated.iter().filter(|s| !s.is_empty()).count();
    if usable < roots.len().min(3) {
        return None;
    }

    Some(
        translated
            .into_iter()
            .zip(roots)
            .map(|(t, original)| if t.is_empty() { original.clone() } else { t })
            .collect(),
    )
}
