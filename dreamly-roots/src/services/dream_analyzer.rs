//! Dream analysis
//!
//! Free-text interpretation of a dream in the dream's language.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::services::model_client::{LanguageModel, ModelError, TextRequest};
use crate::text::{guess_language, Language};

const SYSTEM_PROMPT: &str =
    "You provide concise dream analysis text only. No headings, no questions, no advice.";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Dream text is empty")]
    EmptyText,

    #[error("Empty analysis")]
    EmptyOutput,

    #[error("Analysis call failed: {0}")]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DreamAnalysis {
    pub analysis: String,
    pub model: String,
}

fn analysis_prompt(text: &str, language: Language) -> String {
    format!(
        "Dream text:\n\"\"\"{}\"\"\"\n\n\
         Write a concise dream analysis in {}.\n\n\
         Rules:\n\
         - Do NOT include any titles or section headers.\n\
         - Do NOT include words like \"Summary\", \"Key symbols\", or \"Possible emotions\".\n\
         - Do NOT ask questions.\n\
         - Do NOT give advice or suggestions.\n\
         - Do NOT address the user directly.\n\
         - Avoid medical or diagnostic language.\n\
         - Write as a natural, flowing interpretation paragraph (2-4 short paragraphs max).\n\n\
         Keep it under ~1000 characters.",
        text,
        language.display_name()
    )
}

pub struct DreamAnalyzer {
    model: Arc<dyn LanguageModel>,
}

impl DreamAnalyzer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Interpret a dream; `language` defaults to the character-range guess
    pub async fn analyze(
        &self,
        text: &str,
        language: Option<Language>,
    ) -> Result<DreamAnalysis, AnalysisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AnalysisError::EmptyText);
        }

        let language = language.unwrap_or_else(|| guess_language(text));
        let analysis = self
            .model
            .complete_text(TextRequest {
                system: Some(SYSTEM_PROMPT.to_string()),
                user: analysis_prompt(text, language),
                temperature: Some(0.7),
            })
            .await?
            .trim()
            .to_string();

        if analysis.is_empty() {
            return Err(AnalysisError::EmptyOutput);
        }

        tracing::info!(lang = language.code(), chars = analysis.chars().count(), "Dream analyzed");

        Ok(DreamAnalysis {
            analysis,
            model: self.model.model_name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_language() {
        assert!(analysis_prompt("x", Language::Ru).contains("in Russian."));
        assert!(analysis_prompt("x", Language::He).contains("in Hebrew."));
        assert!(analysis_prompt("x", Language::Unknown).contains("in English."));
    }
}
