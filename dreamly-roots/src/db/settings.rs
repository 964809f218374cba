//! Settings database operations
//!
//! Key-value accessors over the `settings` table.

use sqlx::{Pool, Sqlite};
use dreamly_common::{Error, Result};

const MODEL_API_KEY: &str = "model_api_key";
const DEFAULT_CITY: &str = "default_city";

/// Hosted model API key, if stored
pub async fn get_model_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, MODEL_API_KEY).await
}

pub async fn set_model_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, MODEL_API_KEY, key).await
}

/// City id (`country|admin1|city`) used for map aggregation, if stored
pub async fn get_default_city(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, DEFAULT_CITY).await
}

pub async fn set_default_city(db: &Pool<Sqlite>, city_id: String) -> Result<()> {
    set_setting(db, DEFAULT_CITY, city_id).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT value FROM settings WHERE key = ?"
    )
    .bind(key)
    .fetch_optional(db)
    .await
    .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value.parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting failed: {}", e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value"
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
