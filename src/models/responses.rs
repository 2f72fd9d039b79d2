//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::service::ServiceStats;

/// Confirmation returned by GET /data/update/:key
pub const UPDATE_CONFIRMATION: &str =
    "The update is ready and Cache invalidated notification was sent";

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Configured cache name
    pub cache: String,
    /// Instance serving the request
    pub instance_id: String,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found no live entry in the local cache
    pub misses: u64,
    /// Values loaded from the primary source
    pub loads: u64,
    /// Entries dropped by invalidation
    pub invalidations: u64,
    /// Entries dropped by the capacity bound
    pub evictions: u64,
    /// Entries dropped by TTL
    pub expirations: u64,
    /// Invalidation messages published by this instance
    pub notifications_sent: u64,
    /// Invalidation messages received by this instance
    pub notifications_received: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Combines store and service counters.
    pub fn new(
        cache: impl Into<String>,
        instance_id: impl Into<String>,
        cache_stats: &CacheStats,
        service_stats: &ServiceStats,
    ) -> Self {
        Self {
            cache: cache.into(),
            instance_id: instance_id.into(),
            hits: cache_stats.hits,
            misses: cache_stats.misses,
            loads: service_stats.loads,
            invalidations: cache_stats.invalidations,
            evictions: cache_stats.evictions,
            expirations: cache_stats.expirations,
            notifications_sent: service_stats.notifications_sent,
            notifications_received: service_stats.notifications_received,
            total_entries: cache_stats.total_entries,
            hit_rate: cache_stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Instance serving the request
    pub instance_id: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(instance_id: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            instance_id: instance_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
