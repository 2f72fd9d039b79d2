//! In-process message broker.
//!
//! Every subscription on a topic receives every message published to it,
//! including messages from the instance that subscribed. Instances sharing
//! one broker therefore behave like peers on a fan-out topic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::{InvalidationMessage, PublishError, Publisher, Subscriber, Subscription};

/// Broadcast-channel broker shared by all instances in a process.
#[derive(Debug)]
pub struct InMemoryBroker {
    topics: RwLock<HashMap<String, broadcast::Sender<InvalidationMessage>>>,
    /// Messages buffered per topic before slow subscriptions start missing them
    capacity: usize,
    closed: AtomicBool,
}

impl InMemoryBroker {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of live subscriptions on `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .get(topic)
            .map_or(0, |sender| sender.receiver_count())
    }

    /// Shuts the broker down. Open subscriptions end and publishing fails.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.topics.write().await.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self, topic: &str) -> Result<(), PublishError> {
        if self.is_closed() {
            return Err(PublishError::Closed);
        }
        if topic.is_empty() {
            return Err(PublishError::EmptyTopic);
        }
        Ok(())
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl Publisher for InMemoryBroker {
    async fn publish(
        &self,
        topic: &str,
        message: InvalidationMessage,
    ) -> Result<usize, PublishError> {
        self.check_open(topic)?;

        let topics = self.topics.read().await;
        let Some(sender) = topics.get(topic) else {
            debug!(topic, key = %message.key, "No subscribers on topic, message dropped");
            return Ok(0);
        };

        // Send only fails when nobody is listening
        Ok(sender.send(message).unwrap_or(0))
    }
}

#[async_trait]
impl Subscriber for InMemoryBroker {
    async fn subscribe(&self, topic: &str) -> Result<Subscription, PublishError> {
        self.check_open(topic)?;

        let mut topics = self.topics.write().await;
        let receiver = topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        Ok(Subscription::new(topic.to_string(), receiver))
    }
}
