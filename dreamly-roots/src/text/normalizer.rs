//! Dream text normalization
//!
//! `normalize()` turns free text into a small bag of lowercase tokens suitable for
//! emoji index lookups. Output order carries no meaning; callers treat the result as
//! an unordered multiset.

use serde::{Deserialize, Serialize};

use super::lexicon::ConceptLexicon;

/// Maximum tokens returned by `normalize()`
pub const MAX_TOKENS: usize = 20;

/// Tokens shorter than this (in chars) are dropped
const MIN_TOKEN_CHARS: usize = 3;

/// Words of this length or shorter are never singularized
const MAX_UNSAFE_SINGULAR_CHARS: usize = 3;

const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "we", "you", "he", "she", "it", "they", "a", "an", "the", "and", "or",
    "but", "was", "were", "am", "is", "are", "be", "been", "to", "of", "in", "on", "at", "for",
    "with", "from", "into", "over", "under", "that", "this", "there", "here", "then", "dream",
    "dreamed", "dreaming",
];

const IRREGULAR_SINGULAR: &[(&str, &str)] = &[
    ("mice", "mouse"),
    ("geese", "goose"),
    ("teeth", "tooth"),
    ("feet", "foot"),
    ("children", "child"),
    ("people", "person"),
    ("men", "man"),
    ("women", "woman"),
];

/// Dream language as far as the pipeline cares
///
/// Best-effort hint only. Anything that is not recognizably English is treated
/// as needing translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ru,
    He,
    Unknown,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
            Language::He => "he",
            Language::Unknown => "unknown",
        }
    }

    /// Parse a language code as returned by the model or a client
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "en" | "eng" | "english" => Language::En,
            "ru" | "rus" | "russian" => Language::Ru,
            "he" | "heb" | "hebrew" | "iw" => Language::He,
            _ => Language::Unknown,
        }
    }

    pub fn is_english(&self) -> bool {
        matches!(self, Language::En)
    }

    /// Human-readable name used in model prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Ru => "Russian",
            Language::He => "Hebrew",
            Language::En | Language::Unknown => "English",
        }
    }
}

/// Guess the dream language from character ranges
///
/// Hebrew-only → he; Cyrillic without Hebrew → ru; Latin-only → en; else unknown.
pub fn guess_language(text: &str) -> Language {
    let has_hebrew = text.chars().any(|c| ('\u{0590}'..='\u{05FF}').contains(&c));
    let has_cyrillic = text.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c));
    let has_latin = text.chars().any(|c| c.is_ascii_alphabetic());

    if has_hebrew && !has_cyrillic && !has_latin {
        Language::He
    } else if has_cyrillic && !has_hebrew {
        Language::Ru
    } else if has_latin && !has_hebrew && !has_cyrillic {
        Language::En
    } else {
        Language::Unknown
    }
}

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Rule-based English singularizer
///
/// Irregular table first, then suffix rules in priority order:
/// sibilant plurals, `-ies`, `-ves`, plain `-s` (not `-ss`).
pub fn singularize_en(word: &str) -> String {
    let s = word.to_lowercase();
    if s.is_empty() {
        return s;
    }

    if let Some((_, singular)) = IRREGULAR_SINGULAR.iter().find(|(plural, _)| *plural == s) {
        return singular.to_string();
    }

    let len = s.chars().count();
    if len <= MAX_UNSAFE_SINGULAR_CHARS {
        return s;
    }

    if ["ches", "shes", "xes", "ses", "zes"]
        .iter()
        .any(|suffix| s.ends_with(suffix))
    {
        return s[..s.len() - 2].to_string();
    }

    if len > 4 {
        if let Some(stem) = s.strip_suffix("ies") {
            return format!("{}y", stem);
        }
        if let Some(stem) = s.strip_suffix("ves") {
            return format!("{}f", stem);
        }
    }

    if s.ends_with('s') && !s.ends_with("ss") {
        return s[..s.len() - 1].to_string();
    }

    s
}

/// Replace everything except letters, digits, hyphen, apostrophe and whitespace with a space
fn strip_symbols(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '\'' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// Normalize dream text into lookup tokens
///
/// English tokens are singularized; other languages go through the concept
/// lexicon so that known stems surface as English concept words. Stop words
/// are checked on the raw token and again on the singular, so "dreams" is
/// dropped like "dream" while "this" is never turned into "thi".
pub fn normalize(text: &str, language: Language, lexicon: &ConceptLexicon) -> Vec<String> {
    let cleaned = strip_symbols(&text.to_lowercase());

    cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|w| !is_stop_word(w))
        .map(|w| {
            if language.is_english() {
                singularize_en(w)
            } else {
                lexicon
                    .map_token(language, w)
                    .map(str::to_string)
                    .unwrap_or_else(|| w.to_string())
            }
        })
        .filter(|w| !is_stop_word(w))
        .take(MAX_TOKENS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm_en(text: &str) -> Vec<String> {
        normalize(text, Language::En, &ConceptLexicon::bundled())
    }

    #[test]
    fn test_flying_over_burning_forest() {
        let tokens = norm_en("I was flying over a burning forest");
        assert_eq!(tokens, vec!["flying", "burning", "forest"]);
    }

    #[test]
    fn test_only_stop_words_yields_nothing() {
        assert!(norm_en("the a an").is_empty());
        assert!(norm_en("I dreamed that I was there").is_empty());
    }

    #[test]
    fn test_punctuation_is_stripped() {
        let tokens = norm_en("Wolves!!! chased (me) through... the snow.");
        assert_eq!(tokens, vec!["wolf", "chased", "through", "snow"]);
    }

    #[test]
    fn test_token_cap() {
        let text = (0..50).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ");
        assert_eq!(norm_en(&text).len(), MAX_TOKENS);
    }

    #[test]
    fn test_singularize_rules() {
        assert_eq!(singularize_en("mice"), "mouse");
        assert_eq!(singularize_en("children"), "child");
        assert_eq!(singularize_en("churches"), "church");
        assert_eq!(singularize_en("boxes"), "box");
        assert_eq!(singularize_en("berries"), "berry");
        assert_eq!(singularize_en("wolves"), "wolf");
        assert_eq!(singularize_en("trees"), "tree");
        assert_eq!(singularize_en("glass"), "glass");
        assert_eq!(singularize_en("bus"), "bus");
        assert_eq!(singularize_en("flying"), "flying");
    }

    #[test]
    fn test_plural_stop_words_dropped() {
        let tokens = norm_en("Dreams about this forest and dreamed rivers");
        assert_eq!(tokens, vec!["about", "forest", "river"]);
    }

    #[test]
    fn test_non_english_goes_through_lexicon() {
        let tokens = normalize("Я гулял в лесу", Language::Ru, &ConceptLexicon::bundled());
        assert!(tokens.contains(&"forest".to_string()), "got {:?}", tokens);
        assert!(tokens.contains(&"гулял".to_string()));
    }

    #[test]
    fn test_guess_language() {
        assert_eq!(guess_language("A dark forest"), Language::En);
        assert_eq!(guess_language("Тёмный лес"), Language::Ru);
        assert_eq!(guess_language("יער חשוך"), Language::He);
        assert_eq!(guess_language("forest лес יער"), Language::Unknown);
        assert_eq!(guess_language("1234"), Language::Unknown);
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::from_code(" EN "), Language::En);
        assert_eq!(Language::from_code("ru"), Language::Ru);
        assert_eq!(Language::from_code("fr"), Language::Unknown);
        assert_eq!(Language::He.code(), "he");
    }
}
