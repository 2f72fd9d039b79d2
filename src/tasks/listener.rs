//! Invalidation Listener Task
//!
//! Drives this instance's subscription to the invalidation topic.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::messaging::{Delivery, Subscription};
use crate::service::CacheService;

/// Spawns a task that applies every invalidation received on `subscription`.
///
/// If the subscription reports dropped messages, any key could be stale, so
/// the whole local cache is cleared. The task ends when the topic closes.
pub fn spawn_invalidation_listener(
    service: Arc<CacheService>,
    mut subscription: Subscription,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            instance = %service.instance_id(),
            topic = %subscription.topic(),
            "Listening for cache invalidations"
        );

        while let Some(delivery) = subscription.recv().await {
            match delivery {
                Delivery::Message(message) => {
                    service.on_cache_invalidation(&message).await;
                }
                Delivery::Missed(missed) => {
                    warn!(
                        instance = %service.instance_id(),
                        missed,
                        "Invalidation messages lost, clearing local cache"
                    );
                    service.invalidate_all().await;
                }
            }
        }

        info!(instance = %service.instance_id(), "Invalidation topic closed, listener stopped");
    })
}
