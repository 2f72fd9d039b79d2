//! Primary Source Module
//!
//! The system of record the cache reads through to and writes go to.

mod sample;

use async_trait::async_trait;
use thiserror::Error;

pub use sample::SampleSource;

/// Failure reported by a primary source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source could not be reached or refused the request
    #[error("primary source unavailable: {0}")]
    Unavailable(String),
}

/// Read and write access to the primary data source.
#[async_trait]
pub trait PrimarySource: Send + Sync {
    /// Loads the current value for `key`.
    async fn fetch(&self, key: &str) -> Result<String, SourceError>;

    /// Applies a write for `key`.
    async fn update(&self, key: &str) -> Result<(), SourceError>;
}
