//! In-Flight Registry
//!
//! Single-flight bookkeeping for producer calls, one marker per key.

use std::collections::HashMap;
use std::fmt;

use futures::future::{BoxFuture, Shared};

use crate::error::Result;

/// Outcome of a flight, awaitable by any number of callers.
pub type SharedFlight<T> = Shared<BoxFuture<'static, Result<T>>>;

/// Why a producer call was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightKind {
    /// Key was missing or had to be refetched synchronously
    Load,
    /// Stale value is being served while the producer runs in the background
    Revalidate,
}

/// Marker for a producer call in progress.
pub struct Flight<T> {
    /// Unique per flight; a completing flight writes only while its generation is still registered
    pub generation: u64,
    pub kind: FlightKind,
    pub result: SharedFlight<T>,
}

impl<T> fmt::Debug for Flight<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flight")
            .field("generation", &self.generation)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

// == In-Flight Registry ==
/// At most one flight per key.
pub struct InFlightRegistry<T> {
    flights: HashMap<String, Flight<T>>,
    next_generation: u64,
}

impl<T> InFlightRegistry<T> {
    pub fn new() -> Self {
        Self {
            flights: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Hands out the next generation number. Never repeats.
    pub fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    pub fn get(&self, key: &str) -> Option<&Flight<T>> {
        self.flights.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.flights.contains_key(key)
    }

    /// Registers a flight for `key` unless one is already running.
    ///
    /// Returns false and drops `flight` if the key is taken.
    pub fn register(&mut self, key: &str, flight: Flight<T>) -> bool {
        if self.flights.contains_key(key) {
            return false;
        }
        self.flights.insert(key.to_string(), flight);
        true
    }

    /// Removes the marker for `key` only if it still belongs to `generation`.
    ///
    /// Returns false when the flight was superseded by an invalidation.
    pub fn complete(&mut self, key: &str, generation: u64) -> bool {
        match self.flights.get(key) {
            Some(flight) if flight.generation == generation => {
                self.flights.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Flight<T>> {
        self.flights.remove(key)
    }

    /// Removes every marker whose key matches `predicate`.
    pub fn remove_where(&mut self, predicate: impl Fn(&str) -> bool) -> usize {
        let before = self.flights.len();
        self.flights.retain(|key, _| !predicate(key));
        before - self.flights.len()
    }

    pub fn clear(&mut self) {
        self.flights.clear();
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}

impl<T> Default for InFlightRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for InFlightRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightRegistry")
            .field("flights", &self.flights)
            .field("next_generation", &self.next_generation)
            .finish()
    }
}
