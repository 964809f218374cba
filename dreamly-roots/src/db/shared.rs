//! Shared dream feed and reactions
//!
//! A shared dream is a snapshot of the owner's dream keyed `{uid}_{dreamId}`.
//! Reaction counts live on the snapshot; each user's on/off state lives in
//! `shared_reactions`. Counts never drop below zero.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use dreamly_common::{Error, Result};

use super::dreams::{DreamEmoji, DreamRecord};

/// Feed page size
pub const FEED_LIMIT: i64 = 50;

/// Reaction kinds a viewer can toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKey {
    Heart,
    Like,
    Star,
}

impl ReactionKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "heart" => Some(Self::Heart),
            "like" => Some(Self::Like),
            "star" => Some(Self::Star),
            _ => None,
        }
    }

    fn count_column(self) -> &'static str {
        match self {
            Self::Heart => "heart_count",
            Self::Like => "like_count",
            Self::Star => "star_count",
        }
    }

    fn flag_column(self) -> &'static str {
        match self {
            Self::Heart => "heart",
            Self::Like => "like_on",
            Self::Star => "star",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCounts {
    pub heart: i64,
    pub like: i64,
    pub star: i64,
}

/// One viewer's reaction state on a shared dream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyReactions {
    pub heart: bool,
    pub like: bool,
    pub star: bool,
}

impl MyReactions {
    fn get(&self, key: ReactionKey) -> bool {
        match key {
            ReactionKey::Heart => self.heart,
            ReactionKey::Like => self.like,
            ReactionKey::Star => self.star,
        }
    }
}

/// Shared copy of a dream as shown in the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDream {
    pub shared_id: String,
    pub owner_uid: String,
    pub owner_dream_id: String,
    pub text: String,
    pub date_key: String,
    pub created_at_ms: i64,
    pub roots_lang: Option<String>,
    pub emojis: Vec<DreamEmoji>,
    pub icons_en: Vec<String>,
    pub shared_at_ms: i64,
    pub reactions: ReactionCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_reactions: Option<MyReactions>,
}

/// Result of a reaction toggle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionToggle {
    pub shared_id: String,
    pub key: ReactionKey,
    /// Viewer's state after the toggle
    pub on: bool,
    pub reactions: ReactionCounts,
}

/// `{uid}_{dreamId}`
pub fn shared_id_for(user_id: &str, dream_id: &str) -> String {
    format!("{}_{}", user_id, dream_id)
}

fn counts_from_row(row: &SqliteRow) -> Result<ReactionCounts> {
    Ok(ReactionCounts {
        heart: row.try_get("heart_count")?,
        like: row.try_get("like_count")?,
        star: row.try_get("star_count")?,
    })
}

fn shared_from_row(row: &SqliteRow, with_mine: bool) -> Result<SharedDream> {
    let emojis: String = row.try_get("emojis")?;
    let icons_en: String = row.try_get("icons_en")?;
    let my_reactions = if with_mine {
        Some(MyReactions {
            heart: row.try_get::<Option<i64>, _>("my_heart")?.unwrap_or(0) != 0,
            like: row.try_get::<Option<i64>, _>("my_like")?.unwrap_or(0) != 0,
            star: row.try_get::<Option<i64>, _>("my_star")?.unwrap_or(0) != 0,
        })
    } else {
        None
    };

    Ok(SharedDream {
        shared_id: row.try_get("shared_id")?,
        owner_uid: row.try_get("owner_uid")?,
        owner_dream_id: row.try_get("owner_dream_id")?,
        text: row.try_get("text")?,
        date_key: row.try_get("date_key")?,
        created_at_ms: row.try_get("created_at_ms")?,
        roots_lang: row.try_get("roots_lang")?,
        emojis: serde_json::from_str(&emojis)
            .map_err(|e| Error::Internal(format!("Corrupt shared emojis: {}", e)))?,
        icons_en: serde_json::from_str(&icons_en)
            .map_err(|e| Error::Internal(format!("Corrupt shared icons: {}", e)))?,
        shared_at_ms: row.try_get("shared_at_ms")?,
        reactions: counts_from_row(row)?,
        my_reactions,
    })
}

/// Write or refresh the shared snapshot of `dream`
///
/// Re-sharing keeps the existing reaction counts.
pub async fn upsert_snapshot(
    tx: &mut Transaction<'_, Sqlite>,
    dream: &DreamRecord,
    shared_at_ms: i64,
) -> Result<String> {
    let shared_id = shared_id_for(&dream.user_id, &dream.dream_id);
    let emojis = serde_json::to_string(&dream.emojis)
        .map_err(|e| Error::Internal(format!("Failed to serialize emojis: {}", e)))?;
    let icons_en = serde_json::to_string(&dream.icons_en)
        .map_err(|e| Error::Internal(format!("Failed to serialize icons: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO shared_dreams (
            shared_id, owner_uid, owner_dream_id, text, date_key, created_at_ms,
            roots_lang, emojis, icons_en, shared_at_ms, deleted, deleted_at_ms
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, NULL)
        ON CONFLICT(shared_id) DO UPDATE SET
            text = excluded.text,
            date_key = excluded.date_key,
            created_at_ms = excluded.created_at_ms,
            roots_lang = excluded.roots_lang,
            emojis = excluded.emojis,
            icons_en = excluded.icons_en,
            shared_at_ms = excluded.shared_at_ms,
            deleted = 0,
            deleted_at_ms = NULL
        "#,
    )
    .bind(&shared_id)
    .bind(&dream.user_id)
    .bind(&dream.dream_id)
    .bind(&dream.text)
    .bind(&dream.date_key)
    .bind(dream.created_at_ms)
    .bind(&dream.roots_lang)
    .bind(emojis)
    .bind(icons_en)
    .bind(shared_at_ms)
    .execute(&mut **tx)
    .await?;

    Ok(shared_id)
}

/// Hide the shared copy of a dream; a dream that was never shared is a no-op
pub async fn mark_deleted(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    dream_id: &str,
    deleted_at_ms: i64,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE shared_dreams SET deleted = 1, deleted_at_ms = ? WHERE shared_id = ? AND deleted = 0",
    )
    .bind(deleted_at_ms)
    .bind(shared_id_for(user_id, dream_id))
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Newest shared dreams first
///
/// With a viewer, each entry carries that viewer's reaction state.
pub async fn list_shared(db: &SqlitePool, viewer: Option<&str>) -> Result<Vec<SharedDream>> {
    let rows = match viewer {
        Some(viewer) => {
            sqlx::query(
                r#"
                SELECT s.*, r.heart AS my_heart, r.like_on AS my_like, r.star AS my_star
                FROM shared_dreams s
                LEFT JOIN shared_reactions r ON r.shared_id = s.shared_id AND r.user_id = ?
                WHERE s.deleted = 0
                ORDER BY s.shared_at_ms DESC
                LIMIT ?
                "#,
            )
            .bind(viewer)
            .bind(FEED_LIMIT)
            .fetch_all(db)
            .await?
        }
        None => {
            sqlx::query(
                "SELECT * FROM shared_dreams WHERE deleted = 0 ORDER BY shared_at_ms DESC LIMIT ?",
            )
            .bind(FEED_LIMIT)
            .fetch_all(db)
            .await?
        }
    };

    rows.iter()
        .map(|row| shared_from_row(row, viewer.is_some()))
        .collect()
}

/// Flip one viewer's reaction and adjust the shared count in one transaction
///
/// Returns `NotFound` for a missing or deleted shared dream.
pub async fn toggle_reaction(
    db: &SqlitePool,
    shared_id: &str,
    user_id: &str,
    key: ReactionKey,
    now_ms: i64,
) -> Result<ReactionToggle> {
    let mut tx = db.begin().await?;

    let row = sqlx::query(
        "SELECT heart_count, like_count, star_count FROM shared_dreams WHERE shared_id = ? AND deleted = 0",
    )
    .bind(shared_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| Error::NotFound(format!("shared dream {}", shared_id)))?;
    let mut counts = counts_from_row(&row)?;

    let mine = sqlx::query(
        "SELECT heart, like_on, star FROM shared_reactions WHERE shared_id = ? AND user_id = ?",
    )
    .bind(shared_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;
    let mut mine = match mine {
        Some(row) => MyReactions {
            heart: row.try_get::<i64, _>("heart")? != 0,
            like: row.try_get::<i64, _>("like_on")? != 0,
            star: row.try_get::<i64, _>("star")? != 0,
        },
        None => MyReactions::default(),
    };

    let on = !mine.get(key);
    let slot = match key {
        ReactionKey::Heart => {
            mine.heart = on;
            &mut counts.heart
        }
        ReactionKey::Like => {
            mine.like = on;
            &mut counts.like
        }
        ReactionKey::Star => {
            mine.star = on;
            &mut counts.star
        }
    };
    *slot = (*slot + if on { 1 } else { -1 }).max(0);
    let count = *slot;

    // column names come from a closed enum
    let update = format!(
        "UPDATE shared_dreams SET {} = ? WHERE shared_id = ?",
        key.count_column()
    );
    sqlx::query(&update)
        .bind(count)
        .bind(shared_id)
        .execute(&mut *tx)
        .await?;

    let upsert = format!(
        r#"
        INSERT INTO shared_reactions (shared_id, user_id, {col}, updated_at_ms)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(shared_id, user_id) DO UPDATE SET
            {col} = excluded.{col},
            updated_at_ms = excluded.updated_at_ms
        "#,
        col = key.flag_column()
    );
    sqlx::query(&upsert)
        .bind(shared_id)
        .bind(user_id)
        .bind(on as i64)
        .bind(now_ms)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::debug!(shared_id = %shared_id, user_id = %user_id, ?key, on, count, "Reaction toggled");
    Ok(ReactionToggle {
        shared_id: shared_id.to_string(),
        key,
        on,
        reactions: counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn pool_with_shared(shared_id: &str) -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        sqlx::query(
            r#"
            INSERT INTO shared_dreams
                (shared_id, owner_uid, owner_dream_id, text, date_key, created_at_ms, shared_at_ms)
            VALUES (?, 'owner', 'd1', 'text', '2024-03-01', 1, 1)
            "#,
        )
        .bind(shared_id)
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[test]
    fn test_reaction_key_parse() {
        assert_eq!(ReactionKey::parse(" Heart "), Some(ReactionKey::Heart));
        assert_eq!(ReactionKey::parse("like"), Some(ReactionKey::Like));
        assert_eq!(ReactionKey::parse("star"), Some(ReactionKey::Star));
        assert_eq!(ReactionKey::parse("clap"), None);
    }

    #[tokio::test]
    async fn test_double_toggle_cancels() {
        let pool = pool_with_shared("owner_d1").await;

        let first = toggle_reaction(&pool, "owner_d1", "u1", ReactionKey::Heart, 10)
            .await
            .unwrap();
        assert!(first.on);
        assert_eq!(first.reactions.heart, 1);

        let second = toggle_reaction(&pool, "owner_d1", "u1", ReactionKey::Heart, 11)
            .await
            .unwrap();
        assert!(!second.on);
        assert_eq!(second.reactions, ReactionCounts::default());
    }

    #[tokio::test]
    async fn test_count_never_negative() {
        let pool = pool_with_shared("owner_d1").await;
        // viewer row says "on" but the count was already zeroed
        sqlx::query(
            "INSERT INTO shared_reactions (shared_id, user_id, star, updated_at_ms) VALUES ('owner_d1', 'u1', 1, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let toggle = toggle_reaction(&pool, "owner_d1", "u1", ReactionKey::Star, 5)
            .await
            .unwrap();
        assert!(!toggle.on);
        assert_eq!(toggle.reactions.star, 0);
    }

    #[tokio::test]
    async fn test_keys_are_independent_per_user() {
        let pool = pool_with_shared("owner_d1").await;
        toggle_reaction(&pool, "owner_d1", "u1", ReactionKey::Like, 1).await.unwrap();
        toggle_reaction(&pool, "owner_d1", "u2", ReactionKey::Like, 2).await.unwrap();
        let last = toggle_reaction(&pool, "owner_d1", "u1", ReactionKey::Heart, 3)
            .await
            .unwrap();
        assert_eq!(last.reactions, ReactionCounts { heart: 1, like: 2, star: 0 });

        let feed = list_shared(&pool, Some("u1")).await.unwrap();
        let mine = feed[0].my_reactions.unwrap();
        assert!(mine.heart && mine.like && !mine.star);

        let anonymous = list_shared(&pool, None).await.unwrap();
        assert!(anonymous[0].my_reactions.is_none());
    }

    #[tokio::test]
    async fn test_missing_or_deleted_shared_dream() {
        let pool = pool_with_shared("owner_d1").await;
        let err = toggle_reaction(&pool, "nope", "u1", ReactionKey::Heart, 1).await;
        assert!(matches!(err, Err(Error::NotFound(_))));

        let mut tx = pool.begin().await.unwrap();
        assert!(mark_deleted(&mut tx, "owner", "d1", 9).await.unwrap());
        tx.commit().await.unwrap();

        let err = toggle_reaction(&pool, "owner_d1", "u1", ReactionKey::Heart, 10).await;
        assert!(matches!(err, Err(Error::NotFound(_))));
        assert!(list_shared(&pool, None).await.unwrap().is_empty());
    }
}
