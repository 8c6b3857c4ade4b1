//! Cache Module
//!
//! Cache Store contract plus an in-process implementation with TTL
//! expiration and LRU/FIFO eviction.

mod entry;
mod eviction;
mod memory;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

pub use entry::{current_timestamp_ms, CacheEntry};
pub use eviction::{EvictionPolicy, EvictionTracker, FifoTracker, LruTracker};
pub use memory::MemoryCacheStore;
pub use stats::CacheStats;
pub use store::CacheStore;
