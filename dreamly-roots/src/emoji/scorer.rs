//! Candidate scoring and deduplication
//!
//! Each raw hit is scored against the query token that produced it. Tiers, highest
//! first: exact name, exact keyword, whole-word match, raw substring. Hits that
//! match several query tokens get a bonus; generic query tokens get a penalty.
//! Garbage categories (flags, skin tones, keycaps, regional indicators, known-bad
//! phrases) are excluded before scoring.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::index::EmojiRecord;
use super::overrides::OverrideSet;

/// Maximum candidates returned by `score_and_rank()`
pub const MAX_CANDIDATES: usize = 20;

/// Keywords carried on each candidate
const MAX_CANDIDATE_KEYWORDS: usize = 24;

const GENERIC_TOKENS: &[&str] = &["thing", "stuff", "object"];

/// Name phrases that lexically match dream words but never fit a dream
const BAD_PHRASES: &[&str] = &["on ground"];

/// Score weights
///
/// Only the ordering of the match tiers is load-bearing; the values are tunable
/// through the `[scoring]` config table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub exact_name: i32,
    pub exact_keyword: i32,
    pub whole_word: i32,
    pub substring: i32,
    pub multi_token_bonus: i32,
    pub multi_token_step: i32,
    pub generic_penalty: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            exact_name: 170,
            exact_keyword: 150,
            whole_word: 120,
            substring: 55,
            multi_token_bonus: 25,
            multi_token_step: 6,
            generic_penalty: 40,
        }
    }
}

/// Ranked candidate for one root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmojiCandidate {
    pub native: String,
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    pub score: i32,
}

/// Raw index hits for one query token
#[derive(Debug, Clone)]
pub struct TokenHits {
    pub token: String,
    pub hits: Vec<EmojiRecord>,
}

/// Categorically inappropriate emoji, excluded regardless of score
pub fn is_garbage(record: &EmojiRecord) -> bool {
    let id = record.id.to_lowercase();
    let name = record.name.to_lowercase();

    id.starts_with("flag-")
        || name.contains("flag")
        || id.contains("skin-tone")
        || id.starts_with("keycap")
        || name.contains("keycap")
        || name.contains("regional indicator")
        || BAD_PHRASES.iter().any(|p| name.contains(p))
}

fn is_word_boundary(c: char) -> bool {
    c.is_whitespace() || c == '_' || c == '-'
}

/// `word` occurs in `haystack` delimited by start/end, whitespace, `_` or `-`
pub fn has_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    haystack.match_indices(word).any(|(i, _)| {
        let before_ok = haystack[..i].chars().next_back().map_or(true, is_word_boundary);
        let after_ok = haystack[i + word.len()..]
            .chars()
            .next()
            .map_or(true, is_word_boundary);
        before_ok && after_ok
    })
}

/// Scores raw hits into a ranked, glyph-unique candidate list
#[derive(Debug, Clone, Default)]
pub struct CandidateScorer {
    weights: ScoringWeights,
}

impl CandidateScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score one hit against one query token (`None` when it should be dropped)
    ///
    /// `tokens` is the full query so multi-token agreement can be rewarded.
    pub fn score_token(
        &self,
        token: &str,
        tokens: &[String],
        record: &EmojiRecord,
        overrides: &OverrideSet,
    ) -> Option<EmojiCandidate> {
        if is_garbage(record) {
            return None;
        }

        let t = token.trim().to_lowercase();
        if t.is_empty() {
            return None;
        }

        let name = overrides.effective_name(record).to_lowercase();
        let keywords: Vec<String> = overrides
            .effective_keywords(record)
            .iter()
            .map(|k| k.to_lowercase())
            .collect();

        // only name and keywords are scored
        let w = &self.weights;
        let mut score = if name == t {
            w.exact_name
        } else if keywords.iter().any(|k| *k == t) {
            w.exact_keyword
        } else if has_word(&name, &t) || keywords.iter().any(|k| has_word(k, &t)) {
            w.whole_word
        } else if name.contains(&t) || keywords.iter().any(|k| k.contains(&t)) {
            w.substring
        } else {
            return None;
        };

        let matched = tokens
            .iter()
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty())
            .filter(|u| {
                name.contains(u.as_str()) || keywords.iter().any(|k| k.contains(u.as_str()))
            })
            .count() as i32;
        if matched >= 2 {
            score += w.multi_token_bonus + matched * w.multi_token_step;
        }

        if GENERIC_TOKENS.contains(&t.as_str()) {
            score -= w.generic_penalty;
        }

        if score <= 0 {
            return None;
        }

        Some(EmojiCandidate {
            native: record.native.clone(),
            id: record.id.clone(),
            name: overrides.effective_name(record).to_string(),
            keywords: overrides
                .effective_keywords(record)
                .iter()
                .take(MAX_CANDIDATE_KEYWORDS)
                .cloned()
                .collect(),
            score,
        })
    }

    /// Score every hit of every token, dedup by glyph, sort descending, cap
    pub fn score_and_rank(
        &self,
        tokens: &[String],
        hits_per_token: &[TokenHits],
        overrides: &OverrideSet,
    ) -> Vec<EmojiCandidate> {
        let scored = hits_per_token.iter().flat_map(|th| {
            th.hits
                .iter()
                .filter_map(move |record| self.score_token(&th.token, tokens, record, overrides))
        });

        let mut ranked = dedup_keep_best(scored);
        ranked.truncate(MAX_CANDIDATES);
        ranked
    }
}

/// Keep the best-scoring occurrence of each glyph, sorted by descending score
///
/// Equal scores keep first-seen order.
pub fn dedup_keep_best(candidates: impl IntoIterator<Item = EmojiCandidate>) -> Vec<EmojiCandidate> {
    let mut unique: Vec<EmojiCandidate> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        match position.get(&candidate.native) {
            Some(&i) => {
                if candidate.score > unique[i].score {
                    unique[i] = candidate;
                }
            }
            None => {
                position.insert(candidate.native.clone(), unique.len());
                unique.push(candidate);
            }
        }
    }

    unique.sort_by(|a, b| b.score.cmp(&a.score));
    unique
}
