//! Local emoji search and candidate ranking
//!
//! - `index`: in-memory emoji index with single-flight initialization
//! - `overrides`: operator overrides and hints, owned by an explicit cache
//! - `scorer`: relevance scoring, garbage filter and glyph deduplication

pub mod index;
pub mod overrides;
pub mod scorer;

pub use index::{EmojiIndex, EmojiRecord, IndexError, SEARCH_LIMIT};
pub use overrides::{EmojiOverride, OverrideCache, OverrideSet};
pub use scorer::{is_garbage, CandidateScorer, EmojiCandidate, ScoringWeights, TokenHits, MAX_CANDIDATES};
