//! Cache Entry Module
//!
//! A cached value together with the time it was loaded and, when a TTL is
//! configured, the time it stops being served.

use chrono::{DateTime, Duration, Utc};

// == Cache Entry ==
/// A single cached value and its metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// When the value was loaded from the primary source
    pub created_at: DateTime<Utc>,
    /// When the value stops being served, None = no expiration
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry loaded now, expiring after `ttl_seconds` if given.
    pub fn new(value: String, ttl_seconds: Option<u64>) -> Self {
        Self::loaded_at(value, Utc::now(), ttl_seconds)
    }

    /// Creates an entry as if it had been loaded at `created_at`.
    pub fn loaded_at(value: String, created_at: DateTime<Utc>, ttl_seconds: Option<u64>) -> Self {
        let expires_at = ttl_seconds
            .and_then(|ttl| i64::try_from(ttl).ok())
            .and_then(Duration::try_seconds)
            .and_then(|ttl| created_at.checked_add_signed(ttl));

        Self {
            value,
            created_at,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches its expiration time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }

    /// Checks whether the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Age of the entry in milliseconds.
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.created_at).num_milliseconds()
    }
}
