//! Cache Module
//!
//! Local cache storage with optional TTL expiration and LRU-bounded capacity.

mod entry;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{CacheStore, LocalCache, MemoryCacheStore};
