//! Cache Statistics Module
//!
//! Lookup and removal counters for a cache store.

use serde::ser::{Serialize, SerializeStruct, Serializer};

// == Cache Stats ==
/// Counters since the store was created. `total_entries` is a gauge.
///
/// Serializes with a derived `hit_rate` field next to the counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing, or only a stale entry
    pub misses: u64,
    /// Entries pushed out by the capacity bound
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Entries removed by explicit invalidation
    pub invalidations: u64,
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total lookups served.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Returns hits / lookups, or 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }

    pub fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn record_invalidations(&mut self, count: usize) {
        self.invalidations += count as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}

impl Serialize for CacheStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CacheStats", 7)?;
        state.serialize_field("hits", &self.hits)?;
        state.serialize_field("misses", &self.misses)?;
        state.serialize_field("hit_rate", &self.hit_rate())?;
        state.serialize_field("evictions", &self.evictions)?;
        state.serialize_field("expirations", &self.expirations)?;
        state.serialize_field("invalidations", &self.invalidations)?;
        state.serialize_field("total_entries", &self.total_entries)?;
        state.end()
    }
}
