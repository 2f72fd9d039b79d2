//! Messaging Module
//!
//! Publish/subscribe plumbing that carries invalidation messages between
//! instances.
//!
//! # Components
//! - `Publisher` / `Subscriber`: the seams the service talks to
//! - `InMemoryBroker`: in-process transport with one broadcast channel per topic

mod broker;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};

pub use broker::InMemoryBroker;

/// A request to drop the cached entry for `key`.
///
/// Serialized as a bare JSON string; the key is the whole payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvalidationMessage {
    pub key: String,
}

impl InvalidationMessage {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Failure to hand a message to the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("message broker is closed")]
    Closed,

    #[error("topic name cannot be empty")]
    EmptyTopic,
}

/// Outbound side of the invalidation channel.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes `message` on `topic` without waiting for delivery.
    ///
    /// Returns how many subscriptions the message was handed to.
    async fn publish(
        &self,
        topic: &str,
        message: InvalidationMessage,
    ) -> Result<usize, PublishError>;
}

/// Inbound side of the invalidation channel.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Opens a subscription that receives every message published on `topic`
    /// from now on.
    async fn subscribe(&self, topic: &str) -> Result<Subscription, PublishError>;
}

/// What a subscription yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Message(InvalidationMessage),
    /// The subscription fell behind and `n` messages were dropped
    Missed(u64),
}

/// A live subscription to one topic.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<InvalidationMessage>,
}

impl Subscription {
    pub(crate) fn new(topic: String, receiver: broadcast::Receiver<InvalidationMessage>) -> Self {
        Self { topic, receiver }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for the next delivery. Returns None once the topic is closed.
    pub async fn recv(&mut self) -> Option<Delivery> {
        match self.receiver.recv().await {
            Ok(message) => Some(Delivery::Message(message)),
            Err(RecvError::Lagged(missed)) => Some(Delivery::Missed(missed)),
            Err(RecvError::Closed) => None,
        }
    }
}
