//! Operator overrides and hints
//!
//! `OverrideCache` owns the current override/hint set. Readers take an immutable
//! snapshot; admin writes call `refresh()` to reload it from the database.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use dreamly_common::Result;

use super::index::EmojiRecord;

/// Maximum keywords kept on a saved override
pub const MAX_OVERRIDE_KEYWORDS: usize = 50;

/// Operator correction for one emoji identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmojiOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_key: Option<String>,
}

impl EmojiOverride {
    /// Normalized form for storage, `None` when nothing is left to store
    ///
    /// Name is trimmed, icon key lowercased, keywords lowercased, deduplicated
    /// and capped.
    pub fn normalized(&self) -> Option<Self> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let icon_key = self
            .icon_key
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut keywords: Vec<String> = Vec::new();
        for keyword in &self.keywords {
            let keyword = keyword.trim().to_lowercase();
            if keyword.is_empty() || keywords.contains(&keyword) {
                continue;
            }
            keywords.push(keyword);
            if keywords.len() >= MAX_OVERRIDE_KEYWORDS {
                break;
            }
        }

        if name.is_none() && icon_key.is_none() && keywords.is_empty() {
            return None;
        }

        Some(Self {
            name,
            keywords,
            icon_key,
        })
    }
}

/// Immutable snapshot of overrides (by emoji id) and hints (by lowercase root)
#[derive(Debug, Clone, Default)]
pub struct OverrideSet {
    pub overrides: HashMap<String, EmojiOverride>,
    pub hints: HashMap<String, String>,
}

impl OverrideSet {
    pub fn get(&self, id: &str) -> Option<&EmojiOverride> {
        self.overrides.get(id)
    }

    /// Override name when present, otherwise the library name
    pub fn effective_name<'a>(&'a self, record: &'a EmojiRecord) -> &'a str {
        self.get(&record.id)
            .and_then(|o| o.name.as_deref())
            .unwrap_or(&record.name)
    }

    /// A non-empty override keyword list replaces the library list
    pub fn effective_keywords<'a>(&'a self, record: &'a EmojiRecord) -> &'a [String] {
        match self.get(&record.id) {
            Some(o) if !o.keywords.is_empty() => &o.keywords,
            _ => &record.keywords,
        }
    }

    /// Replacement search phrase for a root, if an operator curated one
    pub fn hint_for(&self, root: &str) -> Option<&str> {
        self.hints
            .get(&root.trim().to_lowercase())
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Owned cache of the current `OverrideSet`
#[derive(Debug, Default)]
pub struct OverrideCache {
    current: RwLock<Arc<OverrideSet>>,
}

impl OverrideCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_set(set: OverrideSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(set)),
        }
    }

    pub async fn snapshot(&self) -> Arc<OverrideSet> {
        self.current.read().await.clone()
    }

    pub async fn replace(&self, set: OverrideSet) {
        *self.current.write().await = Arc::new(set);
    }

    /// Reload overrides and hints from the database
    ///
    /// Returns the number of overrides loaded.
    pub async fn refresh(&self, db: &SqlitePool) -> Result<usize> {
        let overrides = crate::db::overrides::list_overrides(db).await?;
        let hints = crate::db::hints::list_hints(db).await?;
        let count = overrides.len();

        tracing::debug!(overrides = count, hints = hints.len(), "Override cache refreshed");

        self.replace(OverrideSet {
            overrides: overrides.into_iter().collect(),
            hints: hints.into_iter().collect(),
        })
        .await;

        Ok(count)
    }
}
