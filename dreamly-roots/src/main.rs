//! dreamly-roots - Dream Root-Word Microservice
//!
//! **Module Identity:**
//! - Name: dreamly-roots
//! - Port: 5740 (default)
//!
//! Extracts symbolic root words from dream entries, maps them to emoji and
//! icons, and aggregates emoji statistics for the dream map.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use dreamly_common::config::{
    default_config_path, load_toml_or_default, RootFolderInitializer, RootFolderResolver,
};
use dreamly_roots::config::{parse_city_or_default, resolve_model_api_key, ServiceConfig};
use dreamly_roots::emoji::EmojiIndex;
use dreamly_roots::services::{ChannelMapIngest, LanguageModel, MapboxGeocoder, OpenAiClient};
use dreamly_roots::text::ConceptLexicon;
use dreamly_roots::{AppServices, AppState};

const MODULE_NAME: &str = "dreamly-roots";

/// Environment variable for the Mapbox token when not set in TOML
const MAPBOX_TOKEN_ENV: &str = "MAPBOX_ACCESS_TOKEN";

#[derive(Debug, Parser)]
#[command(name = "dreamly-roots", version, about = "Dream root-word and emoji service")]
struct Args {
    /// TOML config file (default: ~/.config/dreamly/dreamly-roots.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// HTTP port, overrides the config file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Step 1: Bootstrap config and tracing
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| default_config_path(MODULE_NAME));
    let config: ServiceConfig = load_toml_or_default(&config_path)?;
    dreamly_common::logging::init_tracing(&config.logging)?;

    info!("Starting dreamly-roots (Dream Root-Word) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 2: Resolve root folder and open database
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml_root(config.root_folder.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = dreamly_roots::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Step 3: Hosted model clients
    let api_key = resolve_model_api_key(&db_pool, &config).await?;
    let model_configured = api_key.is_some();
    let model: Arc<dyn LanguageModel> = Arc::new(OpenAiClient::new(
        api_key.clone(),
        config.model.model.clone(),
        config.model.base_url.clone(),
        config.model.timeout(),
    )?);
    let analysis_model: Arc<dyn LanguageModel> = Arc::new(OpenAiClient::new(
        api_key,
        config.model.analysis_model.clone(),
        config.model.base_url.clone(),
        config.model.timeout(),
    )?);

    // Step 4: Emoji index and concept lexicon
    let index = Arc::new(match &config.emoji_dataset_path {
        Some(path) => EmojiIndex::from_file(path.clone()),
        None => EmojiIndex::bundled(),
    });
    let warmup = index.clone();
    tokio::spawn(async move {
        if let Err(e) = warmup.ensure_ready().await {
            warn!(error = %e, "Emoji index warm-up failed");
        }
    });

    let mut lexicon = ConceptLexicon::bundled();
    if let Some(path) = &config.lexicon_path {
        match ConceptLexicon::from_file(path) {
            Ok(extra) => {
                info!(entries = extra.len(), "Loaded concept lexicon {}", path.display());
                lexicon.merge(extra);
            }
            Err(e) => warn!("Concept lexicon {} not loaded: {}", path.display(), e),
        }
    }

    // Step 5: Map aggregation
    let stored_city = dreamly_roots::db::settings::get_default_city(&db_pool).await?;
    let city = match stored_city {
        Some(id) => parse_city_or_default(Some(&id)),
        None => config.default_city(),
    };
    info!(city = %city.id(), "Map default city");

    let mapbox_token = config
        .geocoding
        .mapbox_token
        .clone()
        .or_else(|| std::env::var(MAPBOX_TOKEN_ENV).ok())
        .filter(|t| !t.trim().is_empty());
    let geocoder = match mapbox_token {
        Some(token) => Some(Arc::new(MapboxGeocoder::new(token, Duration::from_secs(10))?)),
        None => {
            info!("Geocoding disabled (no Mapbox token)");
            None
        }
    };

    let (map_sink, map_rx) = ChannelMapIngest::channel(config.map_ingest_queue);

    // Step 6: Application state
    let state = AppState::new(
        db_pool,
        AppServices {
            model,
            analysis_model,
            model_configured,
            index,
            lexicon: Arc::new(lexicon),
            scoring: config.scoring.clone(),
            city,
            geocoder,
            map_sink: Arc::new(map_sink),
            admin_token: config.admin_token.clone(),
        },
    );

    match state.overrides.refresh(&state.db).await {
        Ok(count) => info!(entries = count, "Emoji overrides loaded"),
        Err(e) => warn!("Emoji overrides not loaded: {}", e),
    }
    if state.admin_token.is_none() {
        warn!("No admin_token configured; /api/admin routes are unauthenticated");
    }

    tokio::spawn(state.map_ingestor.clone().run(map_rx));

    // Step 7: Serve
    let port = args.port.unwrap_or(config.port);
    let addr = format!("{}:{}", config.bind_address, port);
    let app = dreamly_roots::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Shutdown signal handler failed: {}", e);
            }
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
