//! Request and Response models for the cache server API
//!
//! This module defines the validated inputs and the DTOs used for
//! serializing HTTP response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{DataKey, MAX_KEY_LENGTH};
pub use responses::{ErrorResponse, HealthResponse, StatsResponse, UPDATE_CONFIRMATION};
