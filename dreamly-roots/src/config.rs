//! Configuration for dreamly-roots
//!
//! Bootstrap settings come from `~/.config/dreamly/dreamly-roots.toml` (or
//! `--config`). The hosted model API key is resolved Database → ENV → TOML.

use dreamly_common::config::LoggingConfig;
use dreamly_common::Result;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::emoji::ScoringWeights;
use crate::services::geocoder::CityRef;
use crate::services::map_ingest::DEFAULT_QUEUE_CAPACITY;
use crate::services::model_client::{
    DEFAULT_ANALYSIS_MODEL, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};

/// Environment variables checked for the model API key, in order
pub const API_KEY_ENV_VARS: &[&str] = &["DREAMLY_OPENAI_API_KEY", "OPENAI_API_KEY"];

pub const DEFAULT_PORT: u16 = 5740;

/// Hosted model settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model for extraction, translation and picks
    pub model: String,
    pub analysis_model: String,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub mapbox_token: Option<String>,
}

/// Service configuration (`dreamly-roots.toml`)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub root_folder: Option<PathBuf>,
    pub port: u16,
    pub bind_address: String,
    pub logging: LoggingConfig,
    pub model: ModelConfig,
    /// emoji-mart style dataset replacing the bundled one
    pub emoji_dataset_path: Option<PathBuf>,
    /// Extra concept lexicon merged over the bundled stems
    pub lexicon_path: Option<PathBuf>,
    pub scoring: ScoringWeights,
    /// `country|admin1|city`
    pub default_city: Option<String>,
    pub geocoding: GeocodingConfig,
    /// Bearer token for `/api/admin`; admin routes are open when unset
    pub admin_token: Option<String>,
    pub map_ingest_queue: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: DEFAULT_PORT,
            bind_address: "127.0.0.1".to_string(),
            logging: LoggingConfig::default(),
            model: ModelConfig::default(),
            emoji_dataset_path: None,
            lexicon_path: None,
            scoring: ScoringWeights::default(),
            default_city: None,
            geocoding: GeocodingConfig::default(),
            admin_token: None,
            map_ingest_queue: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ServiceConfig {
    /// Configured default city, or Washington DC when unset or malformed
    pub fn default_city(&self) -> CityRef {
        parse_city_or_default(self.default_city.as_deref())
    }
}

pub fn parse_city_or_default(city_id: Option<&str>) -> CityRef {
    match city_id {
        Some(id) => CityRef::parse(id).unwrap_or_else(|| {
            warn!("Invalid default city '{}', using {}", id, CityRef::default().id());
            CityRef::default()
        }),
        None => CityRef::default(),
    }
}

/// Resolve the hosted model API key from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML. `None` when no source has a usable key;
/// the service still starts and model-backed calls degrade.
pub async fn resolve_model_api_key(
    db: &Pool<Sqlite>,
    config: &ServiceConfig,
) -> Result<Option<String>> {
    let mut sources = Vec::new();

    // Tier 1: Database (authoritative)
    let db_key = crate::db::settings::get_model_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    if db_key.is_some() {
        sources.push("database");
    }

    // Tier 2: Environment variables
    let env_key = API_KEY_ENV_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|k| is_valid_key(k)));
    if env_key.is_some() {
        sources.push("environment");
    }

    // Tier 3: TOML config
    let toml_key = config.model.api_key.clone().filter(|k| is_valid_key(k));
    if toml_key.is_some() {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "Model API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    let resolved = db_key.or(env_key).or(toml_key);
    match (&resolved, sources.first()) {
        (Some(_), Some(source)) => info!("Model API key loaded from {}", source),
        _ => warn!(
            "Model API key not configured; root extraction will fail and translation/picks fall back. \
             Set {} or model.api_key in TOML.",
            API_KEY_ENV_VARS[0]
        ),
    }

    Ok(resolved.map(|k| k.trim().to_string()))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
