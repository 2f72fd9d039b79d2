//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::cache::{CacheStore, LocalCache, MemoryCacheStore};
use crate::config::Config;
use crate::error::Result;
use crate::messaging::Publisher;
use crate::models::{HealthResponse, StatsResponse, UPDATE_CONFIRMATION};
use crate::service::CacheService;
use crate::source::PrimarySource;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache-aside service for this instance
    pub service: Arc<CacheService>,
    /// The service's local store, shared with background tasks
    pub store: Arc<dyn CacheStore>,
    /// Configured cache name
    pub cache_name: String,
}

impl AppState {
    pub fn new(
        service: Arc<CacheService>,
        store: Arc<dyn CacheStore>,
        cache_name: impl Into<String>,
    ) -> Self {
        Self {
            service,
            store,
            cache_name: cache_name.into(),
        }
    }

    /// Wires a store sized from the configuration to the given source and
    /// publisher.
    pub fn from_config(
        config: &Config,
        source: Arc<dyn PrimarySource>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(
            config.cache_name.clone(),
            LocalCache::new(config.capacity(), config.ttl()),
        ));
        let service = CacheService::new(
            store.clone(),
            source,
            publisher,
            config.invalidation_topic.clone(),
        )
        .with_instance_id(config.instance_id.clone());

        Self::new(Arc::new(service), store, config.cache_name.clone())
    }
}

/// Handler for GET /data/get/:key
///
/// Cache-aside read; the body is the value as a JSON string.
pub async fn get_data_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<String>> {
    info!(key = %key, "Start get flow by rest");
    let value = state.service.get_data(&key).await?;
    Ok(Json(value))
}

/// Handler for GET /data/update/:key
///
/// Writes to the primary source and broadcasts an invalidation for the key.
pub async fn update_data_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<&'static str> {
    info!(key = %key, "Start update flow by rest");
    state.service.update_data(&key).await?;
    Ok(UPDATE_CONFIRMATION)
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache_stats = state.service.cache_stats().await;
    let service_stats = state.service.service_stats();

    Json(StatsResponse::new(
        state.cache_name.clone(),
        state.service.instance_id(),
        &cache_stats,
        &service_stats,
    ))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.service.instance_id()))
}
