//! Cache Relay - A read-through cache server
//!
//! Serves values through a local cache backed by a primary source, and keeps
//! caches on every instance consistent by broadcasting invalidations over a
//! publish/subscribe topic.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod messaging;
pub mod models;
pub mod service;
pub mod source;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use service::CacheService;
pub use tasks::{spawn_cleanup_task, spawn_invalidation_listener};
