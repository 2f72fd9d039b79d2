//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Name of the local cache, used in logs and stats
    pub cache_name: String,
    /// Topic carrying invalidation messages between instances
    pub invalidation_topic: String,
    /// Identifier of this instance
    pub instance_id: String,
    /// Maximum number of cached entries, 0 = unbounded
    pub max_entries: usize,
    /// Entry time-to-live in seconds, 0 = never expires
    pub entry_ttl: u64,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Buffered messages per topic before slow subscribers lag
    pub channel_capacity: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `CACHE_NAME` - Cache name (default: my-cache-data)
    /// - `INVALIDATION_TOPIC` - Pub/sub topic (default: cache-invalidation)
    /// - `INSTANCE_ID` - Instance identifier (default: instance-<pid>)
    /// - `MAX_ENTRIES` - Capacity bound, 0 disables it (default: 0)
    /// - `ENTRY_TTL` - TTL in seconds, 0 disables it (default: 0)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 1)
    /// - `CHANNEL_CAPACITY` - Broadcast buffer per topic (default: 1024)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cache_name: string_var("CACHE_NAME").unwrap_or(defaults.cache_name),
            invalidation_topic: string_var("INVALIDATION_TOPIC")
                .unwrap_or(defaults.invalidation_topic),
            instance_id: string_var("INSTANCE_ID").unwrap_or(defaults.instance_id),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            entry_ttl: parse_var("ENTRY_TTL").unwrap_or(defaults.entry_ttl),
            cleanup_interval: parse_var("CLEANUP_INTERVAL")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.cleanup_interval),
            channel_capacity: parse_var("CHANNEL_CAPACITY")
                .filter(|cap| *cap > 0)
                .unwrap_or(defaults.channel_capacity),
        }
    }

    /// Capacity bound, if one is configured.
    pub fn capacity(&self) -> Option<usize> {
        (self.max_entries > 0).then_some(self.max_entries)
    }

    /// Entry TTL in seconds, if one is configured.
    pub fn ttl(&self) -> Option<u64> {
        (self.entry_ttl > 0).then_some(self.entry_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            cache_name: "my-cache-data".to_string(),
            invalidation_topic: "cache-invalidation".to_string(),
            instance_id: format!("instance-{}", std::process::id()),
            max_entries: 0,
            entry_ttl: 0,
            cleanup_interval: 1,
            channel_capacity: 1024,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn string_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
