//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::EvictionPolicy;
use crate::repository::{CacheFailurePolicy, RepositoryOptions, WriteBehindConfig};

// == Write Mode ==
/// Which writable repository the service runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Durable write first, then cache update
    #[default]
    Through,
    /// Cache update now, batched durable write later
    Behind,
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "through" | "write-through" => Ok(WriteMode::Through),
            "behind" | "write-behind" => Ok(WriteMode::Behind),
            other => Err(format!("unknown write mode '{}'", other)),
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Cache TTL in seconds, 0 disables expiry
    pub default_ttl: u64,
    /// Victim selection when the cache is full
    pub eviction_policy: EvictionPolicy,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Write-through or write-behind
    pub write_mode: WriteMode,
    /// Write-behind flush interval in milliseconds
    pub flush_interval_ms: u64,
    /// Pending writes that trigger an early flush
    pub flush_threshold: usize,
    /// Pending writes accepted before `put` is rejected
    pub max_pending: usize,
    /// Deadline for each persistent store call in milliseconds
    pub store_timeout_ms: u64,
    /// Behaviour when the cache store fails
    pub cache_failure_policy: CacheFailurePolicy,
    /// Demo rows loaded into the in-memory store at startup
    pub seed_products: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` (default: 1000)
    /// - `DEFAULT_TTL` seconds (default: 300)
    /// - `EVICTION_POLICY` `lru` | `fifo` (default: lru)
    /// - `SERVER_PORT` (default: 3000)
    /// - `CLEANUP_INTERVAL` seconds (default: 1)
    /// - `WRITE_MODE` `through` | `behind` (default: through)
    /// - `FLUSH_INTERVAL_MS` (default: 500)
    /// - `FLUSH_THRESHOLD` (default: 100)
    /// - `MAX_PENDING` (default: 10000)
    /// - `STORE_TIMEOUT_MS` (default: 2000)
    /// - `CACHE_FAILURE_POLICY` `degrade` | `fail` (default: degrade)
    /// - `SEED_PRODUCTS` (default: 10)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            eviction_policy: env_or("EVICTION_POLICY", defaults.eviction_policy),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            write_mode: env_or("WRITE_MODE", defaults.write_mode),
            flush_interval_ms: env_or("FLUSH_INTERVAL_MS", defaults.flush_interval_ms),
            flush_threshold: env_or("FLUSH_THRESHOLD", defaults.flush_threshold),
            max_pending: env_or("MAX_PENDING", defaults.max_pending),
            store_timeout_ms: env_or("STORE_TIMEOUT_MS", defaults.store_timeout_ms),
            cache_failure_policy: env_or("CACHE_FAILURE_POLICY", defaults.cache_failure_policy),
            seed_products: env_or("SEED_PRODUCTS", defaults.seed_products),
        }
    }

    /// Cache TTL, or None when expiry is disabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.default_ttl > 0).then(|| Duration::from_secs(self.default_ttl))
    }

    pub fn repository_options(&self) -> RepositoryOptions {
        RepositoryOptions {
            store_timeout: Duration::from_millis(self.store_timeout_ms),
            cache_failure_policy: self.cache_failure_policy,
        }
    }

    pub fn write_behind_config(&self) -> WriteBehindConfig {
        WriteBehindConfig {
            flush_interval: Duration::from_millis(self.flush_interval_ms),
            flush_threshold: self.flush_threshold,
            max_pending: self.max_pending,
        }
        .normalized()
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: 300,
            eviction_policy: EvictionPolicy::Lru,
            server_port: 3000,
            cleanup_interval: 1,
            write_mode: WriteMode::Through,
            flush_interval_ms: 500,
            flush_threshold: 100,
            max_pending: 10_000,
            store_timeout_ms: 2000,
            cache_failure_policy: CacheFailurePolicy::Degrade,
            seed_products: 10,
        }
    }
}
