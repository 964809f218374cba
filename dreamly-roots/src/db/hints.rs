//! Emoji search hints
//!
//! Operator-curated `root → search phrase` remaps, both stored lowercase.

use sqlx::SqlitePool;
use std::collections::BTreeMap;

use dreamly_common::Result;

/// All hints as `(root, phrase)`, ordered by root
pub async fn list_hints(db: &SqlitePool) -> Result<Vec<(String, String)>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT root, phrase FROM emoji_hints ORDER BY root")
            .fetch_all(db)
            .await?;
    Ok(rows)
}

/// Lowercase and trim both sides; drop pairs with an empty side
pub fn normalize_hints(raw: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    raw.iter()
        .map(|(root, phrase)| (root.trim().to_lowercase(), phrase.trim().to_lowercase()))
        .filter(|(root, phrase)| !root.is_empty() && !phrase.is_empty())
        .collect()
}

/// Replace the whole hint map in one transaction
pub async fn replace_hints(db: &SqlitePool, hints: &BTreeMap<String, String>) -> Result<usize> {
    let hints = normalize_hints(hints);
    let mut tx = db.begin().await?;

    sqlx::query("DELETE FROM emoji_hints").execute(&mut *tx).await?;
    for (root, phrase) in &hints {
        sqlx::query("INSERT INTO emoji_hints (root, phrase) VALUES (?, ?)")
            .bind(root)
            .bind(phrase)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    tracing::info!(count = hints.len(), "Emoji hints replaced");
    Ok(hints.len())
}
