//! Cache-Aside Service
//!
//! Reads go through the local cache to the primary source; writes go to the
//! primary source and are followed by an invalidation broadcast that every
//! instance (this one included) applies when it arrives.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::single_flight::SingleFlight;
use crate::cache::{CacheStats, CacheStore};
use crate::error::{CacheError, Result};
use crate::messaging::{InvalidationMessage, Publisher};
use crate::models::DataKey;
use crate::source::PrimarySource;

/// Counters kept by the service on top of the store's own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    /// Values loaded from the primary source
    pub loads: u64,
    /// Invalidation messages published
    pub notifications_sent: u64,
    /// Invalidation messages received
    pub notifications_received: u64,
}

// == Cache Service ==
/// Cache-aside reads with broadcast invalidation.
pub struct CacheService {
    instance_id: String,
    topic: String,
    store: Arc<dyn CacheStore>,
    source: Arc<dyn PrimarySource>,
    publisher: Arc<dyn Publisher>,
    flights: SingleFlight,
    loads: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_received: AtomicU64,
}

impl CacheService {
    /// Wires a service to its store, primary source and invalidation publisher.
    pub fn new(
        store: Arc<dyn CacheStore>,
        source: Arc<dyn PrimarySource>,
        publisher: Arc<dyn Publisher>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            instance_id: "local".to_string(),
            topic: topic.into(),
            store,
            source,
            publisher,
            flights: SingleFlight::new(),
            loads: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            notifications_received: AtomicU64::new(0),
        }
    }

    /// Sets the identifier used in logs.
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Topic invalidations are published on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    // == Get Data ==
    /// Returns the cached value for `key`, loading it from the primary source
    /// on a miss.
    ///
    /// Concurrent misses for one key share a single load. A load that races
    /// with an invalidation of its key is returned but not kept.
    pub async fn get_data(&self, key: &str) -> Result<String> {
        let key = DataKey::parse(key)?;
        let key = key.as_str();

        if let Some(value) = self.store.get(key).await {
            debug!(instance = %self.instance_id, key, "Cache hit");
            return Ok(value);
        }

        let flight = self.flights.acquire(key).await;

        // Another load may have completed while this one waited
        if let Some(value) = self.store.peek(key).await {
            debug!(instance = %self.instance_id, key, "Served by concurrent load");
            return Ok(value);
        }

        let value = self.source.fetch(key).await.map_err(|e| {
            warn!(instance = %self.instance_id, key, error = %e, "Primary source fetch failed");
            CacheError::Fetch(e)
        })?;
        self.loads.fetch_add(1, Ordering::SeqCst);

        // Checked under the store's write lock: an invalidation either lands
        // before this and the value is dropped, or after it and evicts it.
        let stored = self
            .store
            .put_if(key, value.clone(), &|| flight.is_current())
            .await;
        if !stored {
            debug!(instance = %self.instance_id, key, "Key invalidated during load, not cached");
        }

        Ok(value)
    }

    // == Update Data ==
    /// Writes `key` to the primary source and tells every instance to drop
    /// its cached copy.
    ///
    /// The local entry is left alone; it goes away when this instance
    /// receives its own notification.
    pub async fn update_data(&self, key: &str) -> Result<()> {
        let key = DataKey::parse(key)?;
        let key = key.as_str();

        info!(instance = %self.instance_id, key, "Update data was invoked");
        self.source.update(key).await.map_err(|e| {
            warn!(instance = %self.instance_id, key, error = %e, "Primary source update failed");
            CacheError::Update(e)
        })?;

        let reached = self
            .publisher
            .publish(&self.topic, InvalidationMessage::new(key))
            .await
            .map_err(|e| {
                warn!(
                    instance = %self.instance_id,
                    key,
                    topic = %self.topic,
                    error = %e,
                    "Invalidation not sent, other instances keep stale entries"
                );
                CacheError::Publish(e)
            })?;

        self.notifications_sent.fetch_add(1, Ordering::SeqCst);
        info!(instance = %self.instance_id, key, subscribers = reached, "Cache notification sent to other instances");
        Ok(())
    }

    // == Invalidate ==
    /// Drops the local entry for `key`. Absent keys are a no-op.
    pub async fn invalidate_data(&self, key: &str) -> bool {
        info!(instance = %self.instance_id, key, "The invalidate cache was invoked");
        self.flights.invalidate(key);
        self.store.evict(key).await
    }

    /// Drops every local entry.
    pub async fn invalidate_all(&self) -> usize {
        self.flights.invalidate_all();
        let dropped = self.store.clear().await;
        warn!(instance = %self.instance_id, dropped, "Local cache cleared");
        dropped
    }

    /// Handles one invalidation message from the subscription.
    pub async fn on_cache_invalidation(&self, message: &InvalidationMessage) -> bool {
        self.notifications_received.fetch_add(1, Ordering::SeqCst);
        info!(instance = %self.instance_id, key = %message.key, "Invalidation request received");
        self.invalidate_data(&message.key).await
    }

    // == Stats ==
    pub async fn cache_stats(&self) -> CacheStats {
        self.store.stats().await
    }

    pub fn service_stats(&self) -> ServiceStats {
        ServiceStats {
            loads: self.loads.load(Ordering::SeqCst),
            notifications_sent: self.notifications_sent.load(Ordering::SeqCst),
            notifications_received: self.notifications_received.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{LocalCache, MemoryCacheStore};
    use crate::messaging::{Delivery, InMemoryBroker, Subscriber};
    use crate::source::{SampleSource, SourceError};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    const TOPIC: &str = "cache-invalidation";

    struct Fixture {
        service: Arc<CacheService>,
        source: Arc<SampleSource>,
        broker: Arc<InMemoryBroker>,
    }

    fn fixture_with(source: SampleSource) -> Fixture {
        let source = Arc::new(source);
        let broker = Arc::new(InMemoryBroker::new(64));
        let store = Arc::new(MemoryCacheStore::new("test", LocalCache::unbounded()));
        let service = Arc::new(CacheService::new(
            store,
            source.clone(),
            broker.clone(),
            TOPIC,
        ));
        Fixture {
            service,
            source,
            broker,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(SampleSource::new())
    }

    #[tokio::test]
    async fn test_first_get_fetches_once() {
        let f = fixture();

        let value = f.service.get_data("abc").await.unwrap();

        assert_eq!(value, "Sample Data for key abc");
        assert_eq!(f.source.fetch_count(), 1);
        assert_eq!(f.service.service_stats().loads, 1);
    }

    #[tokio::test]
    async fn test_cached_get_does_not_fetch() {
        let f = fixture();

        f.service.get_data("abc").await.unwrap();
        let value = f.service.get_data("abc").await.unwrap();

        assert_eq!(value, "Sample Data for key abc");
        assert_eq!(f.source.fetch_count(), 1);
        let stats = f.service.cache_stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_update_publishes_exactly_one_message() {
        let f = fixture();
        let mut subscription = f.broker.subscribe(TOPIC).await.unwrap();

        f.service.update_data("never-cached").await.unwrap();

        assert_eq!(
            subscription.recv().await,
            Some(Delivery::Message(InvalidationMessage::new("never-cached")))
        );
        assert_eq!(f.source.update_count(), 1);
        assert_eq!(f.service.service_stats().notifications_sent, 1);

        let nothing_else =
            tokio::time::timeout(Duration::from_millis(50), subscription.recv()).await;
        assert!(nothing_else.is_err());
    }

    #[tokio::test]
    async fn test_update_leaves_local_entry_until_notified() {
        let f = fixture();
        f.service.get_data("abc").await.unwrap();

        f.service.update_data("abc").await.unwrap();

        assert_eq!(f.service.cache_stats().await.total_entries, 1);
    }

    #[tokio::test]
    async fn test_invalidation_evicts_and_is_idempotent() {
        let f = fixture();
        f.service.get_data("abc").await.unwrap();

        let message = InvalidationMessage::new("abc");
        assert!(f.service.on_cache_invalidation(&message).await);
        assert!(!f.service.on_cache_invalidation(&message).await);
        assert!(!f.service.invalidate_data("never-seen").await);

        f.service.get_data("abc").await.unwrap();
        assert_eq!(f.source.fetch_count(), 2);
        assert_eq!(f.service.service_stats().notifications_received, 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let f = fixture_with(SampleSource::with_latency(Duration::from_millis(50)));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let service = f.service.clone();
                tokio::spawn(async move { service.get_data("hot").await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "Sample Data for key hot");
        }
        assert_eq!(f.source.fetch_count(), 1);
    }

    /// Source whose fetch parks until the test releases it.
    #[derive(Default)]
    struct GatedSource {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl PrimarySource for GatedSource {
        async fn fetch(&self, key: &str) -> std::result::Result<String, SourceError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(SampleSource::value_for(key))
        }

        async fn update(&self, _key: &str) -> std::result::Result<(), SourceError> {
            Ok(())
        }
    }

    /// Store that records what a reader sees right after each conditional put.
    struct ReadAfterPutStore {
        inner: MemoryCacheStore,
        reads: StdMutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl CacheStore for ReadAfterPutStore {
        async fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key).await
        }

        async fn peek(&self, key: &str) -> Option<String> {
            self.inner.peek(key).await
        }

        async fn put(&self, key: &str, value: String) {
            self.inner.put(key, value).await
        }

        async fn put_if(
            &self,
            key: &str,
            value: String,
            keep: &(dyn Fn() -> bool + Send + Sync),
        ) -> bool {
            let stored = self.inner.put_if(key, value, keep).await;
            let seen = self.inner.peek(key).await;
            self.reads.lock().unwrap().push(seen);
            stored
        }

        async fn evict(&self, key: &str) -> bool {
            self.inner.evict(key).await
        }

        async fn clear(&self) -> usize {
            self.inner.clear().await
        }

        async fn cleanup_expired(&self) -> usize {
            self.inner.cleanup_expired().await
        }

        async fn len(&self) -> usize {
            self.inner.len().await
        }

        async fn stats(&self) -> CacheStats {
            self.inner.stats().await
        }
    }

    #[tokio::test]
    async fn test_invalidation_during_load_never_exposes_stale_value() {
        let source = Arc::new(GatedSource::default());
        let store = Arc::new(ReadAfterPutStore {
            inner: MemoryCacheStore::new("test", LocalCache::unbounded()),
            reads: StdMutex::new(Vec::new()),
        });
        let broker = Arc::new(InMemoryBroker::new(64));
        let service = Arc::new(CacheService::new(
            store.clone(),
            source.clone(),
            broker,
            TOPIC,
        ));

        let load = {
            let service = service.clone();
            tokio::spawn(async move { service.get_data("abc").await })
        };

        // The invalidation completes while the fetch is parked
        source.started.notified().await;
        assert!(!service.invalidate_data("abc").await);
        source.release.notify_one();

        assert_eq!(load.await.unwrap().unwrap(), "Sample Data for key abc");
        // No reader ever saw the value loaded before the invalidation
        assert_eq!(*store.reads.lock().unwrap(), vec![None]);
        assert_eq!(service.cache_stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn test_load_after_invalidation_is_cached() {
        let f = fixture();
        f.service.invalidate_data("abc").await;

        f.service.get_data("abc").await.unwrap();

        assert_eq!(f.service.cache_stats().await.total_entries, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_caches_nothing() {
        let f = fixture();
        f.source.set_failing(true);

        let result = f.service.get_data("abc").await;

        assert!(matches!(result, Err(CacheError::Fetch(_))));
        assert_eq!(f.service.cache_stats().await.total_entries, 0);

        f.source.set_failing(false);
        assert!(f.service.get_data("abc").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_failure_publishes_nothing() {
        let f = fixture();
        let mut subscription = f.broker.subscribe(TOPIC).await.unwrap();
        f.source.set_failing(true);

        let result = f.service.update_data("abc").await;

        assert!(matches!(result, Err(CacheError::Update(_))));
        let nothing = tokio::time::timeout(Duration::from_millis(50), subscription.recv()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported() {
        let f = fixture();
        f.broker.close().await;

        let result = f.service.update_data("abc").await;

        assert!(matches!(result, Err(CacheError::Publish(_))));
        assert_eq!(f.source.update_count(), 1);
        assert_eq!(f.service.service_stats().notifications_sent, 0);
    }

    #[tokio::test]
    async fn test_invalid_keys_rejected() {
        let f = fixture();

        assert!(matches!(
            f.service.get_data("").await,
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(
            f.service.update_data(&"k".repeat(300)).await,
            Err(CacheError::InvalidKey(_))
        ));
        assert_eq!(f.source.fetch_count(), 0);
        assert_eq!(f.source.update_count(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let f = fixture();
        f.service.get_data("a").await.unwrap();
        f.service.get_data("b").await.unwrap();

        assert_eq!(f.service.invalidate_all().await, 2);
        assert_eq!(f.service.cache_stats().await.total_entries, 0);
    }
}
