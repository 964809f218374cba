//! Database access for dreamly-roots
//!
//! Single SQLite database in the root folder: settings, dream documents,
//! emoji curation and map aggregation tables.

pub mod dreams;
pub mod hints;
pub mod map_stats;
pub mod overrides;
pub mod settings;
pub mod shared;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dreams (
        user_id TEXT NOT NULL,
        dream_id TEXT NOT NULL,
        text TEXT NOT NULL,
        created_at_ms INTEGER NOT NULL,
        date_key TEXT NOT NULL,
        roots TEXT NOT NULL DEFAULT '[]',
        roots_en TEXT NOT NULL DEFAULT '[]',
        roots_lang TEXT,
        emojis TEXT NOT NULL DEFAULT '[]',
        icons_en TEXT NOT NULL DEFAULT '[]',
        roots_updated_at_ms INTEGER,
        analysis_text TEXT,
        analysis_model TEXT,
        analysis_at_ms INTEGER,
        shared INTEGER NOT NULL DEFAULT 0,
        shared_at_ms INTEGER,
        deleted INTEGER NOT NULL DEFAULT 0,
        deleted_at_ms INTEGER,
        PRIMARY KEY (user_id, dream_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS shared_dreams (
        shared_id TEXT PRIMARY KEY,
        owner_uid TEXT NOT NULL,
        owner_dream_id TEXT NOT NULL,
        text TEXT NOT NULL,
        date_key TEXT NOT NULL,
        created_at_ms INTEGER NOT NULL,
        roots_lang TEXT,
        emojis TEXT NOT NULL DEFAULT '[]',
        icons_en TEXT NOT NULL DEFAULT '[]',
        shared_at_ms INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0,
        deleted_at_ms INTEGER,
        heart_count INTEGER NOT NULL DEFAULT 0,
        like_count INTEGER NOT NULL DEFAULT 0,
        star_count INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS shared_reactions (
        shared_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        heart INTEGER NOT NULL DEFAULT 0,
        like_on INTEGER NOT NULL DEFAULT 0,
        star INTEGER NOT NULL DEFAULT 0,
        updated_at_ms INTEGER NOT NULL,
        PRIMARY KEY (shared_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS emoji_overrides (
        emoji_id TEXT PRIMARY KEY,
        name TEXT,
        keywords TEXT NOT NULL DEFAULT '[]',
        icon_key TEXT,
        updated_at_ms INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS emoji_hints (
        root TEXT PRIMARY KEY,
        phrase TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS map_ingested (
        user_id TEXT NOT NULL,
        dream_id TEXT NOT NULL,
        city_id TEXT NOT NULL,
        date_key TEXT NOT NULL,
        emoji_count INTEGER NOT NULL,
        ingested_at_ms INTEGER NOT NULL,
        PRIMARY KEY (user_id, dream_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS map_totals (
        scope TEXT NOT NULL,
        scope_id TEXT NOT NULL,
        date_key TEXT NOT NULL,
        total_dreams INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (scope, scope_id, date_key)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS map_emoji_counts (
        scope TEXT NOT NULL,
        scope_id TEXT NOT NULL,
        date_key TEXT NOT NULL,
        native TEXT NOT NULL,
        count INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (scope, scope_id, date_key, native)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cities (
        city_id TEXT PRIMARY KEY,
        country TEXT NOT NULL,
        admin1 TEXT NOT NULL,
        city TEXT NOT NULL,
        lat REAL,
        lng REAL,
        updated_at_ms INTEGER NOT NULL
    )
    "#,
];

/// Create service tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    for ddl in TABLES {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::info!(tables = TABLES.len(), "Database tables initialized");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_init_tables_is_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_tables(&pool).await.unwrap();
        init_tables(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
             ('settings','dreams','emoji_overrides','emoji_hints','map_ingested','map_totals','map_emoji_counts','cities',
              'shared_dreams','shared_reactions')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 10);
    }

    #[tokio::test]
    async fn test_init_database_pool_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dreamly.db");
        let _pool = init_database_pool(&path).await.unwrap();
        assert!(path.exists());
    }
}
