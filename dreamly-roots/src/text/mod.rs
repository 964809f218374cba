//! Text handling for dream entries and model output
//!
//! - `normalizer`: tokenization, stop-words, English singularization, language guess
//! - `lexicon`: lemma-to-concept dictionary bridging non-English stems to English concepts
//! - `sanitize`: character stripping and deduplication applied to model-produced roots

pub mod lexicon;
pub mod normalizer;
pub mod sanitize;

pub use lexicon::{ConceptEntry, ConceptLexicon};
pub use normalizer::{guess_language, normalize, singularize_en, Language, MAX_TOKENS};
pub use sanitize::{coerce_string, sanitize_list, sanitize_root};
