//! Background Tasks Module
//!
//! Contains background tasks that run during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals
//! - Invalidation Listener: Applies invalidation messages from the topic

mod cleanup;
mod listener;

pub use cleanup::spawn_cleanup_task;
pub use listener::spawn_invalidation_listener;
