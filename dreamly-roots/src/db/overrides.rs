//! Emoji override storage
//!
//! One row per emoji identifier; keywords stored as JSON text.

use sqlx::{Row, SqlitePool};

use dreamly_common::{Error, Result};

use crate::emoji::EmojiOverride;

/// All stored overrides as `(emoji_id, override)`
pub async fn list_overrides(db: &SqlitePool) -> Result<Vec<(String, EmojiOverride)>> {
    let rows = sqlx::query(
        "SELECT emoji_id, name, keywords, icon_key FROM emoji_overrides ORDER BY emoji_id",
    )
    .fetch_all(db)
    .await?;

    rows.iter()
        .map(|row| -> Result<(String, EmojiOverride)> {
            let keywords: String = row.try_get("keywords")?;
            let keywords: Vec<String> = serde_json::from_str(&keywords)
                .map_err(|e| Error::Internal(format!("Corrupt override keywords: {}", e)))?;
            Ok((
                row.try_get("emoji_id")?,
                EmojiOverride {
                    name: row.try_get("name")?,
                    keywords,
                    icon_key: row.try_get("icon_key")?,
                },
            ))
        })
        .collect()
}

pub async fn get_override(db: &SqlitePool, emoji_id: &str) -> Result<Option<EmojiOverride>> {
    Ok(list_overrides(db)
        .await?
        .into_iter()
        .find(|(id, _)| id == emoji_id)
        .map(|(_, o)| o))
}

/// Store the normalized override; an override that normalizes to nothing is deleted
///
/// Returns the stored form, or `None` when the row was removed.
pub async fn save_override(
    db: &SqlitePool,
    emoji_id: &str,
    raw: &EmojiOverride,
) -> Result<Option<EmojiOverride>> {
    let emoji_id = emoji_id.trim();
    if emoji_id.is_empty() {
        return Err(Error::InvalidInput("emoji id is required".to_string()));
    }

    let Some(normalized) = raw.normalized() else {
        delete_override(db, emoji_id).await?;
        return Ok(None);
    };

    let keywords = serde_json::to_string(&normalized.keywords)
        .map_err(|e| Error::Internal(format!("Failed to serialize keywords: {}", e)))?;

    sqlx::query(
        "INSERT INTO emoji_overrides (emoji_id, name, keywords, icon_key, updated_at_ms)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(emoji_id) DO UPDATE SET
            name = excluded.name,
            keywords = excluded.keywords,
            icon_key = excluded.icon_key,
            updated_at_ms = excluded.updated_at_ms",
    )
    .bind(emoji_id)
    .bind(&normalized.name)
    .bind(keywords)
    .bind(&normalized.icon_key)
    .bind(chrono::Utc::now().timestamp_millis())
    .execute(db)
    .await?;

    tracing::info!(emoji_id = %emoji_id, "Emoji override saved");
    Ok(Some(normalized))
}

/// Returns whether a row was removed
pub async fn delete_override(db: &SqlitePool, emoji_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM emoji_overrides WHERE emoji_id = ?")
        .bind(emoji_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
