//! Request inputs for the cache server API
//!
//! Keys arrive as path segments and are validated before they reach the
//! cache or the primary source.

use std::fmt;

use crate::error::{CacheError, Result};

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// A validated cache key: non-blank and at most `MAX_KEY_LENGTH` bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataKey(String);

impl DataKey {
    /// Validates a raw key.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(CacheError::InvalidKey("Key cannot be empty".to_string()));
        }
        if raw.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidKey(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
