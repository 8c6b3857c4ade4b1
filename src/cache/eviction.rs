//! Eviction Module
//!
//! Access-order tracking used to pick a victim when the cache is at capacity.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::str::FromStr;

// == Eviction Policy ==
/// Which entry to drop when the cache is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Least recently read or written entry goes first
    #[default]
    Lru,
    /// Oldest inserted entry goes first; reads do not reorder
    Fifo,
}

impl EvictionPolicy {
    /// Creates the tracker implementing this policy.
    pub fn tracker<K>(self) -> Box<dyn EvictionTracker<K>>
    where
        K: Clone + PartialEq + Debug + Send + Sync + 'static,
    {
        match self {
            EvictionPolicy::Lru => Box::new(LruTracker::new()),
            EvictionPolicy::Fifo => Box::new(FifoTracker::new()),
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "fifo" => Ok(EvictionPolicy::Fifo),
            other => Err(format!("unknown eviction policy '{}'", other)),
        }
    }
}

// == Eviction Tracker ==
/// Bookkeeping for an eviction policy.
pub trait EvictionTracker<K>: Debug + Send + Sync {
    /// Records a write of `key` (new or overwrite).
    fn record_write(&mut self, key: &K);
    /// Records a successful read of `key`.
    fn record_read(&mut self, key: &K);
    /// Forgets `key`.
    fn remove(&mut self, key: &K);
    /// Returns and forgets the next key to evict.
    fn evict(&mut self) -> Option<K>;
    /// Forgets every key.
    fn clear(&mut self);
    /// Number of tracked keys.
    fn len(&self) -> usize;
    /// True when no keys are tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction.
///
/// Front = most recently used, back = least recently used.
#[derive(Debug)]
pub struct LruTracker<K> {
    order: VecDeque<K>,
}

impl<K: PartialEq> LruTracker<K> {
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    fn touch(&mut self, key: &K)
    where
        K: Clone,
    {
        self.order.retain(|k| k != key);
        self.order.push_front(key.clone());
    }

    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&K> {
        self.order.back()
    }
}

impl<K: PartialEq> Default for LruTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EvictionTracker<K> for LruTracker<K>
where
    K: Clone + PartialEq + Debug + Send + Sync,
{
    fn record_write(&mut self, key: &K) {
        self.touch(key);
    }

    fn record_read(&mut self, key: &K) {
        self.touch(key);
    }

    fn remove(&mut self, key: &K) {
        self.order.retain(|k| k != key);
    }

    fn evict(&mut self) -> Option<K> {
        self.order.pop_back()
    }

    fn clear(&mut self) {
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

// == FIFO Tracker ==
/// Tracks insertion order; overwrites and reads keep the original position.
#[derive(Debug)]
pub struct FifoTracker<K> {
    order: VecDeque<K>,
}

impl<K> FifoTracker<K> {
    /// Creates a new empty FIFO tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }
}

impl<K> Default for FifoTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EvictionTracker<K> for FifoTracker<K>
where
    K: Clone + PartialEq + Debug + Send + Sync,
{
    fn record_write(&mut self, key: &K) {
        if !self.order.contains(key) {
            self.order.push_back(key.clone());
        }
    }

    fn record_read(&mut self, _key: &K) {}

    fn remove(&mut self, key: &K) {
        self.order.retain(|k| k != key);
    }

    fn evict(&mut self) -> Option<K> {
        self.order.pop_front()
    }

    fn clear(&mut self) {
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}
