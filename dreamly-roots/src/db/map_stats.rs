//! Map aggregation storage
//!
//! Per-user and per-city dream totals and per-glyph counters, all-time
//! (`date_key = "all"`) and daily. The `map_ingested` marker and the counter
//! increments share one transaction, so a dream is counted at most once even
//! under concurrent ingests.

use serde::Serialize;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;

use dreamly_common::Result;

use crate::db::dreams::DreamRecord;
use crate::services::geocoder::{CityRef, Coordinates};

pub const ALL_TIME: &str = "all";

/// Glyphs listed per city by `list_cities`
const TOP_EMOJIS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    User,
    City,
}

impl Scope {
    fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::City => "city",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    Ingested { city_id: String, date_key: String },
    Skipped { reason: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmojiCount {
    pub native: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityStats {
    pub city_id: String,
    pub country: String,
    pub admin1: String,
    pub city: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub total_dreams: i64,
    pub top_emojis: Vec<EmojiCount>,
}

async fn bump_total(
    tx: &mut Transaction<'_, Sqlite>,
    scope: Scope,
    scope_id: &str,
    date_key: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO map_totals (scope, scope_id, date_key, total_dreams) VALUES (?, ?, ?, 1)
         ON CONFLICT(scope, scope_id, date_key) DO UPDATE SET total_dreams = total_dreams + 1",
    )
    .bind(scope.as_str())
    .bind(scope_id)
    .bind(date_key)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn bump_emoji(
    tx: &mut Transaction<'_, Sqlite>,
    scope: Scope,
    scope_id: &str,
    date_key: &str,
    native: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO map_emoji_counts (scope, scope_id, date_key, native, count) VALUES (?, ?, ?, ?, 1)
         ON CONFLICT(scope, scope_id, date_key, native) DO UPDATE SET count = count + 1",
    )
    .bind(scope.as_str())
    .bind(scope_id)
    .bind(date_key)
    .bind(native)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Count a dream's emojis for its user and `city`, once per dream
pub async fn ingest_dream(db: &SqlitePool, dream: &DreamRecord, city: &CityRef) -> Result<IngestOutcome> {
    let natives: Vec<&str> = dream
        .emojis
        .iter()
        .map(|e| e.native.trim())
        .filter(|n| !n.is_empty())
        .collect();
    if natives.is_empty() {
        return Ok(IngestOutcome::Skipped {
            reason: Some("no_emojis".to_string()),
        });
    }

    let city_id = city.id();
    let date_key = if dream.date_key.is_empty() {
        crate::db::dreams::date_key_for(dream.created_at_ms)
    } else {
        dream.date_key.clone()
    };
    let now_ms = chrono::Utc::now().timestamp_millis();

    let mut tx = db.begin().await?;

    let marker = sqlx::query(
        "INSERT INTO map_ingested (user_id, dream_id, city_id, date_key, emoji_count, ingested_at_ms)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(user_id, dream_id) DO NOTHING",
    )
    .bind(&dream.user_id)
    .bind(&dream.dream_id)
    .bind(&city_id)
    .bind(&date_key)
    .bind(natives.len() as i64)
    .bind(now_ms)
    .execute(&mut *tx)
    .await?;

    if marker.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(IngestOutcome::Skipped { reason: None });
    }

    sqlx::query(
        "INSERT INTO cities (city_id, country, admin1, city, updated_at_ms) VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(city_id) DO UPDATE SET updated_at_ms = excluded.updated_at_ms",
    )
    .bind(&city_id)
    .bind(&city.country)
    .bind(&city.admin1)
    .bind(&city.city)
    .bind(now_ms)
    .execute(&mut *tx)
    .await?;

    for (scope, scope_id) in [(Scope::User, dream.user_id.as_str()), (Scope::City, city_id.as_str())] {
        for key in [ALL_TIME, date_key.as_str()] {
            bump_total(&mut tx, scope, scope_id, key).await?;
            for native in &natives {
                bump_emoji(&mut tx, scope, scope_id, key, native).await?;
            }
        }
    }

    tx.commit().await?;

    tracing::info!(
        user_id = %dream.user_id,
        dream_id = %dream.dream_id,
        city_id = %city_id,
        emojis = natives.len(),
        "Dream ingested into map stats"
    );

    Ok(IngestOutcome::Ingested { city_id, date_key })
}

pub async fn total_dreams(db: &SqlitePool, scope: Scope, scope_id: &str, date_key: &str) -> Result<i64> {
    let total: Option<i64> = sqlx::query_scalar(
        "SELECT total_dreams FROM map_totals WHERE scope = ? AND scope_id = ? AND date_key = ?",
    )
    .bind(scope.as_str())
    .bind(scope_id)
    .bind(date_key)
    .fetch_optional(db)
    .await?;
    Ok(total.unwrap_or(0))
}

/// Glyph counts for one scope and date key, highest first
pub async fn emoji_counts(
    db: &SqlitePool,
    scope: Scope,
    scope_id: &str,
    date_key: &str,
) -> Result<Vec<EmojiCount>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT native, count FROM map_emoji_counts
         WHERE scope = ? AND scope_id = ? AND date_key = ?
         ORDER BY count DESC, native ASC",
    )
    .bind(scope.as_str())
    .bind(scope_id)
    .bind(date_key)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(native, count)| EmojiCount { native, count })
        .collect())
}

pub async fn city_coordinates(db: &SqlitePool, city_id: &str) -> Result<Option<Coordinates>> {
    let row: Option<(Option<f64>, Option<f64>)> =
        sqlx::query_as("SELECT lat, lng FROM cities WHERE city_id = ?")
            .bind(city_id)
            .fetch_optional(db)
            .await?;

    Ok(match row {
        Some((Some(lat), Some(lng))) => Some(Coordinates { lat, lng }),
        _ => None,
    })
}

pub async fn set_city_coordinates(db: &SqlitePool, city: &CityRef, coords: Coordinates) -> Result<()> {
    sqlx::query(
        "INSERT INTO cities (city_id, country, admin1, city, lat, lng, updated_at_ms)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(city_id) DO UPDATE SET
            lat = excluded.lat, lng = excluded.lng, updated_at_ms = excluded.updated_at_ms",
    )
    .bind(city.id())
    .bind(&city.country)
    .bind(&city.admin1)
    .bind(&city.city)
    .bind(coords.lat)
    .bind(coords.lng)
    .bind(chrono::Utc::now().timestamp_millis())
    .execute(db)
    .await?;
    Ok(())
}

/// All-time stats for every known city, most dreams first
pub async fn list_cities(db: &SqlitePool) -> Result<Vec<CityStats>> {
    let rows = sqlx::query(
        "SELECT c.city_id, c.country, c.admin1, c.city, c.lat, c.lng,
                COALESCE(t.total_dreams, 0) AS total_dreams
         FROM cities c
         LEFT JOIN map_totals t
           ON t.scope = 'city' AND t.scope_id = c.city_id AND t.date_key = 'all'
         ORDER BY total_dreams DESC, c.city_id ASC",
    )
    .fetch_all(db)
    .await?;

    let mut top: HashMap<String, Vec<EmojiCount>> = HashMap::new();
    let counts: Vec<(String, String, i64)> = sqlx::query_as(
        "SELECT scope_id, native, count FROM map_emoji_counts
         WHERE scope = 'city' AND date_key = 'all'
         ORDER BY count DESC, native ASC",
    )
    .fetch_all(db)
    .await?;
    for (city_id, native, count) in counts {
        let list = top.entry(city_id).or_default();
        if list.len() < TOP_EMOJIS {
            list.push(EmojiCount { native, count });
        }
    }

    rows.iter()
        .map(|row| -> Result<CityStats> {
            let city_id: String = row.try_get("city_id")?;
            Ok(CityStats {
                top_emojis: top.remove(&city_id).unwrap_or_default(),
                country: row.try_get("country")?,
                admin1: row.try_get("admin1")?,
                city: row.try_get("city")?,
                lat: row.try_get("lat")?,
                lng: row.try_get("lng")?,
                total_dreams: row.try_get("total_dreams")?,
                city_id,
            })
        })
        .collect()
}
