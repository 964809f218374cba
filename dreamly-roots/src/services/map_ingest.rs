//! Map aggregation side effect
//!
//! The pipeline publishes a `MapIngestEvent` after persisting a dream; a
//! background worker drains the channel and folds the dream's emojis into the
//! per-user and per-city counters. Publishing never blocks the caller.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::db::dreams::DreamStore;
use crate::db::map_stats::{self, IngestOutcome};
use crate::services::geocoder::{CityRef, MapboxGeocoder};

/// Default bounded queue size between pipeline and worker
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapIngestEvent {
    pub user_id: String,
    pub dream_id: String,
}

/// One-way outbound ingest notification
pub trait MapIngestSink: Send + Sync {
    fn publish(&self, event: MapIngestEvent);
}

/// Bounded channel sink; a full or closed queue drops the event
#[derive(Clone)]
pub struct ChannelMapIngest {
    tx: mpsc::Sender<MapIngestEvent>,
}

impl ChannelMapIngest {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<MapIngestEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl MapIngestSink for ChannelMapIngest {
    fn publish(&self, event: MapIngestEvent) {
        if let Err(e) = self.tx.try_send(event) {
            let (reason, event) = match e {
                mpsc::error::TrySendError::Full(ev) => ("queue full", ev),
                mpsc::error::TrySendError::Closed(ev) => ("worker stopped", ev),
            };
            tracing::warn!(
                user_id = %event.user_id,
                dream_id = %event.dream_id,
                reason,
                "Dropping map ingest event"
            );
        }
    }
}

#[derive(Debug, Error)]
pub enum MapIngestError {
    #[error("Dream not found: {0}")]
    DreamNotFound(String),

    #[error(transparent)]
    Store(#[from] dreamly_common::Error),
}

/// Applies ingest events to the map counters
pub struct MapIngestor {
    pool: SqlitePool,
    store: Arc<dyn DreamStore>,
    city: CityRef,
    geocoder: Option<Arc<MapboxGeocoder>>,
}

impl MapIngestor {
    pub fn new(pool: SqlitePool, store: Arc<dyn DreamStore>, city: CityRef) -> Self {
        Self {
            pool,
            store,
            city,
            geocoder: None,
        }
    }

    pub fn with_geocoder(mut self, geocoder: Option<Arc<MapboxGeocoder>>) -> Self {
        self.geocoder = geocoder;
        self
    }

    pub fn city(&self) -> &CityRef {
        &self.city
    }

    /// Count one dream into the map stats, at most once
    pub async fn ingest(&self, user_id: &str, dream_id: &str) -> Result<IngestOutcome, MapIngestError> {
        let dream = self
            .store
            .get_dream(user_id, dream_id)
            .await?
            .ok_or_else(|| MapIngestError::DreamNotFound(format!("{}/{}", user_id, dream_id)))?;

        let outcome = map_stats::ingest_dream(&self.pool, &dream, &self.city).await?;

        if matches!(outcome, IngestOutcome::Ingested { .. }) {
            self.spawn_geocode();
        }

        Ok(outcome)
    }

    /// Detached coordinate lookup for the ingest city, when still unknown
    fn spawn_geocode(&self) {
        let Some(geocoder) = self.geocoder.clone() else {
            return;
        };
        let pool = self.pool.clone();
        let city = self.city.clone();

        tokio::spawn(async move {
            if let Err(e) = resolve_city_coordinates(&pool, &geocoder, &city).await {
                tracing::warn!(city = %city.id(), error = %e, "City geocoding failed");
            }
        });
    }

    /// Worker loop; ends when every sender is dropped
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<MapIngestEvent>) {
        tracing::info!(city = %self.city.id(), "Map ingest worker started");

        while let Some(event) = rx.recv().await {
            match self.ingest(&event.user_id, &event.dream_id).await {
                Ok(outcome) => {
                    tracing::debug!(dream_id = %event.dream_id, ?outcome, "Map ingest processed");
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %event.user_id,
                        dream_id = %event.dream_id,
                        error = %e,
                        "Map ingest failed"
                    );
                }
            }
        }

        tracing::info!("Map ingest worker stopped");
    }
}

/// Geocode and store coordinates unless the city already has them
///
/// Returns `true` when new coordinates were stored.
pub async fn resolve_city_coordinates(
    pool: &SqlitePool,
    geocoder: &MapboxGeocoder,
    city: &CityRef,
) -> anyhow::Result<bool> {
    if map_stats::city_coordinates(pool, &city.id()).await?.is_some() {
        return Ok(false);
    }

    let coords = geocoder.geocode(city).await?;
    map_stats::set_city_coordinates(pool, city, coords).await?;

    tracing::info!(city = %city.id(), lat = coords.lat, lng = coords.lng, "City coordinates stored");
    Ok(true)
}
