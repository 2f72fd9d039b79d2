//! Sample primary source producing deterministic placeholder data.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::{PrimarySource, SourceError};

/// Placeholder source: every key maps to `"Sample Data for key <key>"`.
///
/// Counts fetches and updates so callers can observe how often the cache
/// actually reached the source.
#[derive(Debug, Default)]
pub struct SampleSource {
    fetches: AtomicU64,
    updates: AtomicU64,
    failing: AtomicBool,
    /// Artificial latency applied to every fetch
    latency: Option<Duration>,
}

impl SampleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every fetch by `latency`, widening the window for concurrent misses.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// The value the source holds for `key`.
    pub fn value_for(key: &str) -> String {
        format!("Sample Data for key {key}")
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of updates applied so far.
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), SourceError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(SourceError::Unavailable("sample source is failing".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PrimarySource for SampleSource {
    async fn fetch(&self, key: &str) -> Result<String, SourceError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.check_available()?;

        self.fetches.fetch_add(1, Ordering::SeqCst);
        info!(key, "The data was fetched from the primary source");
        Ok(Self::value_for(key))
    }

    async fn update(&self, key: &str) -> Result<(), SourceError> {
        self.check_available()?;

        // The sample source holds no state; only the write is counted.
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
