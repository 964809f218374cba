//! Lemma-to-concept dictionary
//!
//! Maps language-specific stems to English concept words so that non-English
//! tokens can hit the (English) emoji index. Coverage is deliberately small; an
//! operator extends it with a TOML file instead of code changes:
//!
//! ```toml
//! [[ru]]
//! stem = "гор"
//! concept = "mountain"
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::normalizer::Language;

const BUNDLED_RU: &[(&str, &str)] = &[
    ("лес", "forest"),
    ("дерев", "tree"),
    ("колокол", "bell"),
    ("ветер", "wind"),
    ("ветр", "wind"),
    ("музык", "music"),
    ("мелоди", "music"),
    ("свет", "sun"),
    ("солнц", "sun"),
    ("тишин", "silence"),
    ("звук", "sound"),
];

const BUNDLED_HE: &[(&str, &str)] = &[
    ("יער", "forest"),
    ("פעמון", "bell"),
    ("רוח", "wind"),
    ("מוזיק", "music"),
    ("שמש", "sun"),
];

/// One stem → concept rule
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConceptEntry {
    pub stem: String,
    pub concept: String,
}

/// Lexicon load errors
#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("Failed to read lexicon file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse lexicon TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Stem dictionary keyed by language
#[derive(Debug, Clone, Default)]
pub struct ConceptLexicon {
    entries: HashMap<Language, Vec<ConceptEntry>>,
}

impl ConceptLexicon {
    /// Lexicon compiled into the binary
    pub fn bundled() -> Self {
        let mut lexicon = Self::default();
        for (language, table) in [(Language::Ru, BUNDLED_RU), (Language::He, BUNDLED_HE)] {
            for (stem, concept) in table {
                lexicon.insert(
                    language,
                    ConceptEntry {
                        stem: stem.to_string(),
                        concept: concept.to_string(),
                    },
                );
            }
        }
        lexicon
    }

    /// Parse an operator lexicon (`[[<lang>]]` tables of `stem`/`concept`)
    pub fn from_toml_str(content: &str) -> Result<Self, LexiconError> {
        let raw: HashMap<String, Vec<ConceptEntry>> = toml::from_str(content)?;
        let mut lexicon = Self::default();
        for (code, entries) in raw {
            let language = Language::from_code(&code);
            for entry in entries {
                lexicon.insert(language, entry);
            }
        }
        Ok(lexicon)
    }

    pub fn from_file(path: &Path) -> Result<Self, LexiconError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Add every rule of `other`; stems already present keep their concept
    pub fn merge(&mut self, other: ConceptLexicon) {
        for (language, entries) in other.entries {
            for entry in entries {
                self.insert(language, entry);
            }
        }
    }

    fn insert(&mut self, language: Language, entry: ConceptEntry) {
        let stem = entry.stem.trim().to_lowercase();
        let concept = entry.concept.trim().to_lowercase();
        if stem.is_empty() || concept.is_empty() {
            return;
        }
        let rules = self.entries.entry(language).or_default();
        if rules.iter().any(|r| r.stem == stem) {
            return;
        }
        rules.push(ConceptEntry { stem, concept });
    }

    /// Concept for a lowercase token, matching the longest stem that prefixes it
    pub fn map_token(&self, language: Language, token: &str) -> Option<&str> {
        self.entries
            .get(&language)?
            .iter()
            .filter(|rule| token.starts_with(rule.stem.as_str()))
            .max_by_key(|rule| rule.stem.chars().count())
            .map(|rule| rule.concept.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
