//! Repository Options
//!
//! Settings shared by every repository: store deadline and cache failure policy.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, StoreError};

// == Cache Failure Policy ==
/// What a repository does when the cache store itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheFailurePolicy {
    /// Log the failure and serve from the persistent store
    #[default]
    Degrade,
    /// Fail the operation with `StoreError::CacheUnavailable`
    Fail,
}

impl FromStr for CacheFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "degrade" => Ok(CacheFailurePolicy::Degrade),
            "fail" => Ok(CacheFailurePolicy::Fail),
            other => Err(format!("unknown cache failure policy '{}'", other)),
        }
    }
}

// == Repository Options ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryOptions {
    /// Deadline applied to every persistent store call
    pub store_timeout: Duration,
    pub cache_failure_policy: CacheFailurePolicy,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(2),
            cache_failure_policy: CacheFailurePolicy::Degrade,
        }
    }
}

impl RepositoryOptions {
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn with_cache_failure_policy(mut self, policy: CacheFailurePolicy) -> Self {
        self.cache_failure_policy = policy;
        self
    }
}

/// Runs a store call under a deadline; elapsing yields `StoreError::Timeout`.
pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
