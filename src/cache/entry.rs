//! Cache Entry Module
//!
//! Wraps a cached entity snapshot with TTL metadata.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A cached entity plus the time it was written and when it goes stale.
#[derive(Debug, Clone)]
pub struct CacheEntry<E> {
    /// The cached snapshot
    pub entity: E,
    /// Insertion/update timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl<E> CacheEntry<E> {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    pub fn new(entity: E, ttl: Option<Duration>) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl.map(|ttl| now.saturating_add(ttl.as_millis() as u64));

        Self {
            entity,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches the expiration time,
    /// so a fully elapsed TTL is never served.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Expiry check against an explicit clock reading.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
