//! Emoji candidate index
//!
//! Wraps an emoji-mart shaped dataset (`{"emojis": {id: {id, name, keywords, skins}}}`).
//! The index is an owned service: construct it once, call `ensure_ready()` before
//! searching. Initialization is single-flight; concurrent callers wait on the same
//! load and a failed load is retried by the next caller.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Maximum raw hits returned per token
pub const SEARCH_LIMIT: usize = 80;

const BUNDLED_DATASET: &str = include_str!("../../data/emoji-dataset.json");

/// Index load errors
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to read emoji dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse emoji dataset: {0}")]
    Parse(String),
}

/// One emoji from the library, before any operator override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiRecord {
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    /// Default-skin glyph
    pub native: String,
}

#[derive(Debug, Deserialize)]
struct RawDataset {
    emojis: BTreeMap<String, RawEmoji>,
}

#[derive(Debug, Deserialize)]
struct RawEmoji {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    skins: Vec<RawSkin>,
}

#[derive(Debug, Deserialize)]
struct RawSkin {
    #[serde(default)]
    native: String,
}

/// Parse emoji-mart JSON into records (entries without a glyph are skipped)
pub fn parse_dataset(json: &str) -> Result<Vec<EmojiRecord>, IndexError> {
    let raw: RawDataset =
        serde_json::from_str(json).map_err(|e| IndexError::Parse(e.to_string()))?;

    Ok(raw
        .emojis
        .into_iter()
        .filter_map(|(key, emoji)| {
            let native = emoji.skins.into_iter().next()?.native;
            if native.trim().is_empty() {
                return None;
            }
            Some(EmojiRecord {
                id: emoji.id.unwrap_or(key),
                name: emoji.name,
                keywords: emoji.keywords,
                native,
            })
        })
        .collect())
}

#[derive(Debug)]
enum DatasetSource {
    Bundled,
    File(PathBuf),
    Records(Vec<EmojiRecord>),
}

#[derive(Debug)]
struct IndexedRecord {
    record: EmojiRecord,
    /// `,id,name,kw1,kw2...` lowercased
    haystack: String,
}

/// In-memory emoji search index
#[derive(Debug)]
pub struct EmojiIndex {
    source: DatasetSource,
    records: OnceCell<Arc<Vec<IndexedRecord>>>,
}

impl EmojiIndex {
    /// Index over the curated dataset compiled into the binary
    pub fn bundled() -> Self {
        Self::with_source(DatasetSource::Bundled)
    }

    /// Index over a full emoji-mart dataset on disk
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::with_source(DatasetSource::File(path.into()))
    }

    pub fn from_records(records: Vec<EmojiRecord>) -> Self {
        Self::with_source(DatasetSource::Records(records))
    }

    fn with_source(source: DatasetSource) -> Self {
        Self {
            source,
            records: OnceCell::new(),
        }
    }

    /// Load the dataset once; later calls return immediately
    pub async fn ensure_ready(&self) -> Result<(), IndexError> {
        self.records
            .get_or_try_init(|| async {
                let records = match &self.source {
                    DatasetSource::Bundled => parse_dataset(BUNDLED_DATASET)?,
                    DatasetSource::File(path) => {
                        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
                            IndexError::Io {
                                path: path.display().to_string(),
                                source: e,
                            }
                        })?;
                        parse_dataset(&json)?
                    }
                    DatasetSource::Records(records) => records.clone(),
                };

                tracing::info!(records = records.len(), "Emoji index initialized");
                Ok::<_, IndexError>(Arc::new(records.into_iter().map(index_record).collect()))
            })
            .await?;
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.records.initialized()
    }

    pub fn len(&self) -> usize {
        self.records.get().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records whose haystack contains `token`, earliest match position first
    ///
    /// Returns nothing before `ensure_ready()` has completed.
    pub fn search(&self, token: &str) -> Vec<EmojiRecord> {
        let needle = token.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let Some(records) = self.records.get() else {
            tracing::debug!(token = %needle, "Emoji index searched before initialization");
            return Vec::new();
        };

        let mut hits: Vec<(usize, usize)> = records
            .iter()
            .enumerate()
            .filter_map(|(idx, r)| r.haystack.find(&needle).map(|pos| (pos, idx)))
            .collect();
        hits.sort_unstable();

        hits.into_iter()
            .take(SEARCH_LIMIT)
            .map(|(_, idx)| records[idx].record.clone())
            .collect()
    }

    /// Library record by identifier
    pub fn get(&self, id: &str) -> Option<EmojiRecord> {
        self.records
            .get()?
            .iter()
            .find(|r| r.record.id == id)
            .map(|r| r.record.clone())
    }
}

fn index_record(record: EmojiRecord) -> IndexedRecord {
    let haystack = format!(",{},{},{}", record.id, record.name, record.keywords.join(","))
        .to_lowercase();
    IndexedRecord { record, haystack }
}
