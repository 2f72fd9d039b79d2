//! Per-key coalescing of concurrent cache misses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
struct Flight {
    lock: Arc<Mutex<()>>,
    /// Bumped whenever the key is invalidated while a flight exists
    generation: AtomicU64,
}

/// Serializes loads per key so that concurrent misses trigger one fetch.
///
/// A flight lives in the map only while some task holds or awaits it.
#[derive(Debug, Default)]
pub struct SingleFlight {
    flights: DashMap<String, Arc<Flight>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task is loading `key`, then claims the load.
    pub async fn acquire(&self, key: &str) -> FlightGuard<'_> {
        let flight = self
            .flights
            .entry(key.to_string())
            .or_default()
            .value()
            .clone();

        let guard = flight.lock.clone().lock_owned().await;
        let generation = flight.generation.load(Ordering::SeqCst);

        FlightGuard {
            owner: self,
            key: key.to_string(),
            flight,
            generation,
            guard: Some(guard),
        }
    }

    /// Marks any load in progress for `key` as stale.
    pub fn invalidate(&self, key: &str) {
        if let Some(flight) = self.flights.get(key) {
            flight.generation.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Marks every load in progress as stale.
    pub fn invalidate_all(&self) {
        for flight in self.flights.iter() {
            flight.generation.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Number of keys currently being loaded or awaited.
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }
}

/// Exclusive claim on loading one key.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    owner: &'a SingleFlight,
    key: String,
    flight: Arc<Flight>,
    generation: u64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl FlightGuard<'_> {
    /// False once the key has been invalidated since the claim was taken.
    pub fn is_current(&self) -> bool {
        self.flight.generation.load(Ordering::SeqCst) == self.generation
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map and this guard still reference the flight: nobody waits
        self.owner
            .flights
            .remove_if(&self.key, |_, flight| Arc::strong_count(flight) <= 2);
    }
}
