//! Service Module
//!
//! The cache-aside service: read-through loads, writes followed by an
//! invalidation broadcast, and the subscriber side that applies them.

mod cache_aside;
mod single_flight;

pub use cache_aside::{CacheService, ServiceStats};
pub use single_flight::{FlightGuard, SingleFlight};
