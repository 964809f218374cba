//! Dream document storage
//!
//! `DreamStore` is the persistence seam the pipeline depends on;
//! `SqliteDreamStore` implements it on the service database. Array fields are
//! stored as JSON text.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use dreamly_common::{Error, Result};

use super::shared;

/// Most recent dreams returned by `list_dreams`
pub const LIST_LIMIT: i64 = 200;

/// Emoji persisted with a dream, aligned with its roots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DreamEmoji {
    pub native: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Dream document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamRecord {
    pub user_id: String,
    pub dream_id: String,
    pub text: String,
    pub created_at_ms: i64,
    /// `YYYY-MM-DD` (UTC) of `created_at_ms`
    pub date_key: String,
    pub roots: Vec<String>,
    pub roots_en: Vec<String>,
    pub roots_lang: Option<String>,
    pub emojis: Vec<DreamEmoji>,
    pub icons_en: Vec<String>,
    pub roots_updated_at_ms: Option<i64>,
    pub analysis_text: Option<String>,
    pub analysis_model: Option<String>,
    pub analysis_at_ms: Option<i64>,
    #[serde(default)]
    pub shared: bool,
    pub shared_at_ms: Option<i64>,
    #[serde(default)]
    pub deleted: bool,
    pub deleted_at_ms: Option<i64>,
}

impl DreamRecord {
    /// Roots (either variant) and visuals (emojis or icons) are both present
    pub fn is_processed(&self) -> bool {
        let has_roots = !self.roots.is_empty() || !self.roots_en.is_empty();
        let has_visuals = !self.emojis.is_empty() || !self.icons_en.is_empty();
        has_roots && has_visuals
    }
}

/// Pipeline output written back to a dream
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RootsUpdate {
    pub roots: Vec<String>,
    pub roots_en: Vec<String>,
    pub roots_lang: String,
    pub emojis: Vec<DreamEmoji>,
    pub icons_en: Vec<String>,
}

/// Per-user dream documents
#[async_trait]
pub trait DreamStore: Send + Sync {
    async fn create_dream(&self, user_id: &str, text: &str) -> Result<DreamRecord>;

    async fn get_dream(&self, user_id: &str, dream_id: &str) -> Result<Option<DreamRecord>>;

    async fn save_roots(&self, user_id: &str, dream_id: &str, update: &RootsUpdate) -> Result<()>;

    async fn save_analysis(
        &self,
        user_id: &str,
        dream_id: &str,
        analysis: &str,
        model: &str,
    ) -> Result<()>;

    /// Live dreams of one user, newest first
    async fn list_dreams(&self, user_id: &str) -> Result<Vec<DreamRecord>>;

    /// Mark the dream deleted and hide its shared copy
    async fn soft_delete_dream(&self, user_id: &str, dream_id: &str) -> Result<DreamRecord>;

    /// Publish a snapshot of the dream to the shared feed
    async fn share_dream(&self, user_id: &str, dream_id: &str) -> Result<DreamRecord>;

    /// Withdraw the dream from the shared feed
    async fn unshare_dream(&self, user_id: &str, dream_id: &str) -> Result<DreamRecord>;
}

/// `YYYY-MM-DD` (UTC) for a millisecond timestamp
pub fn date_key_for(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%d")
        .to_string()
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize dream field: {}", e)))
}

fn from_json<T: for<'de> Deserialize<'de>>(column: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| Error::Internal(format!("Corrupt dream column {}: {}", column, e)))
}

fn row_to_record(row: &SqliteRow) -> Result<DreamRecord> {
    Ok(DreamRecord {
        user_id: row.try_get("user_id")?,
        dream_id: row.try_get("dream_id")?,
        text: row.try_get("text")?,
        created_at_ms: row.try_get("created_at_ms")?,
        date_key: row.try_get("date_key")?,
        roots: from_json("roots", &row.try_get::<String, _>("roots")?)?,
        roots_en: from_json("roots_en", &row.try_get::<String, _>("roots_en")?)?,
        roots_lang: row.try_get("roots_lang")?,
        emojis: from_json("emojis", &row.try_get::<String, _>("emojis")?)?,
        icons_en: from_json("icons_en", &row.try_get::<String, _>("icons_en")?)?,
        roots_updated_at_ms: row.try_get("roots_updated_at_ms")?,
        analysis_text: row.try_get("analysis_text")?,
        analysis_model: row.try_get("analysis_model")?,
        analysis_at_ms: row.try_get("analysis_at_ms")?,
        shared: row.try_get::<i64, _>("shared")? != 0,
        shared_at_ms: row.try_get("shared_at_ms")?,
        deleted: row.try_get::<i64, _>("deleted")? != 0,
        deleted_at_ms: row.try_get("deleted_at_ms")?,
    })
}

/// SQLite-backed `DreamStore`
#[derive(Clone)]
pub struct SqliteDreamStore {
    pool: SqlitePool,
}

impl SqliteDreamStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_live(
        tx: &mut Transaction<'_, Sqlite>,
        user_id: &str,
        dream_id: &str,
    ) -> Result<DreamRecord> {
        let row = sqlx::query("SELECT * FROM dreams WHERE user_id = ? AND dream_id = ?")
            .bind(user_id)
            .bind(dream_id)
            .fetch_optional(&mut **tx)
            .await?;

        match row.as_ref().map(row_to_record).transpose()? {
            Some(dream) if !dream.deleted => Ok(dream),
            _ => Err(Error::NotFound(format!("dream {}/{}", user_id, dream_id))),
        }
    }
}

#[async_trait]
impl DreamStore for SqliteDreamStore {
    async fn create_dream(&self, user_id: &str, text: &str) -> Result<DreamRecord> {
        let now_ms = Utc::now().timestamp_millis();
        let record = DreamRecord {
            user_id: user_id.to_string(),
            dream_id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            created_at_ms: now_ms,
            date_key: date_key_for(now_ms),
            roots: Vec::new(),
            roots_en: Vec::new(),
            roots_lang: None,
            emojis: Vec::new(),
            icons_en: Vec::new(),
            roots_updated_at_ms: None,
            analysis_text: None,
            analysis_model: None,
            analysis_at_ms: None,
            shared: false,
            shared_at_ms: None,
            deleted: false,
            deleted_at_ms: None,
        };

        sqlx::query(
            r#"
            INSERT INTO dreams (user_id, dream_id, text, created_at_ms, date_key)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.dream_id)
        .bind(&record.text)
        .bind(record.created_at_ms)
        .bind(&record.date_key)
        .execute(&self.pool)
        .await?;

        tracing::debug!(user_id = %user_id, dream_id = %record.dream_id, "Dream created");
        Ok(record)
    }

    async fn get_dream(&self, user_id: &str, dream_id: &str) -> Result<Option<DreamRecord>> {
        let row = sqlx::query("SELECT * FROM dreams WHERE user_id = ? AND dream_id = ?")
            .bind(user_id)
            .bind(dream_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn save_roots(&self, user_id: &str, dream_id: &str, update: &RootsUpdate) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE dreams SET
                roots = ?, roots_en = ?, roots_lang = ?, emojis = ?, icons_en = ?,
                roots_updated_at_ms = ?
            WHERE user_id = ? AND dream_id = ?
            "#,
        )
        .bind(to_json(&update.roots)?)
        .bind(to_json(&update.roots_en)?)
        .bind(&update.roots_lang)
        .bind(to_json(&update.emojis)?)
        .bind(to_json(&update.icons_en)?)
        .bind(Utc::now().timestamp_millis())
        .bind(user_id)
        .bind(dream_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("dream {}/{}", user_id, dream_id)));
        }
        Ok(())
    }

    async fn save_analysis(
        &self,
        user_id: &str,
        dream_id: &str,
        analysis: &str,
        model: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE dreams SET analysis_text = ?, analysis_model = ?, analysis_at_ms = ?
            WHERE user_id = ? AND dream_id = ?
            "#,
        )
        .bind(analysis)
        .bind(model)
        .bind(Utc::now().timestamp_millis())
        .bind(user_id)
        .bind(dream_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("dream {}/{}", user_id, dream_id)));
        }
        Ok(())
    }

    async fn list_dreams(&self, user_id: &str) -> Result<Vec<DreamRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM dreams
            WHERE user_id = ? AND deleted = 0
            ORDER BY created_at_ms DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(LIST_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn soft_delete_dream(&self, user_id: &str, dream_id: &str) -> Result<DreamRecord> {
        let now_ms = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;
        let mut dream = Self::fetch_live(&mut tx, user_id, dream_id).await?;

        sqlx::query(
            "UPDATE dreams SET deleted = 1, deleted_at_ms = ? WHERE user_id = ? AND dream_id = ?",
        )
        .bind(now_ms)
        .bind(user_id)
        .bind(dream_id)
        .execute(&mut *tx)
        .await?;
        let unshared = shared::mark_deleted(&mut tx, user_id, dream_id, now_ms).await?;

        tx.commit().await?;

        dream.deleted = true;
        dream.deleted_at_ms = Some(now_ms);
        tracing::debug!(user_id = %user_id, dream_id = %dream_id, unshared, "Dream deleted");
        Ok(dream)
    }

    async fn share_dream(&self, user_id: &str, dream_id: &str) -> Result<DreamRecord> {
        let now_ms = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;
        let mut dream = Self::fetch_live(&mut tx, user_id, dream_id).await?;

        shared::upsert_snapshot(&mut tx, &dream, now_ms).await?;
        sqlx::query(
            "UPDATE dreams SET shared = 1, shared_at_ms = ? WHERE user_id = ? AND dream_id = ?",
        )
        .bind(now_ms)
        .bind(user_id)
        .bind(dream_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        dream.shared = true;
        dream.shared_at_ms = Some(now_ms);
        Ok(dream)
    }

    async fn unshare_dream(&self, user_id: &str, dream_id: &str) -> Result<DreamRecord> {
        let now_ms = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;
        let mut dream = Self::fetch_live(&mut tx, user_id, dream_id).await?;

        sqlx::query(
            "UPDATE dreams SET shared = 0, shared_at_ms = NULL WHERE user_id = ? AND dream_id = ?",
        )
        .bind(user_id)
        .bind(dream_id)
        .execute(&mut *tx)
        .await?;
        shared::mark_deleted(&mut tx, user_id, dream_id, now_ms).await?;

        tx.commit().await?;

        dream.shared = false;
        dream.shared_at_ms = None;
        Ok(dream)
    }
}
