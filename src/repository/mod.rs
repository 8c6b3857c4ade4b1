//! Repository Module
//!
//! Read-through, write-through and write-behind repositories composed from a
//! `CacheStore` and a `PersistentStore`.

mod options;
mod pending;
mod read_through;
mod write_behind;
mod write_through;


use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::cache::CacheStats;
use crate::entity::Entity;
use crate::error::Result;
use crate::predicate::Predicate;

pub use options::{CacheFailurePolicy, RepositoryOptions};
pub use pending::{PendingQueue, WriteState};
pub use read_through::ReadThroughRepository;
pub use write_behind::{
    FlushReport, FlushStats, Flusher, WriteBehindConfig, WriteBehindRepository,
};
pub use write_through::WriteThroughRepository;

// == Repository Stats ==
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryStats {
    /// `write-through` or `write-behind`
    pub mode: &'static str,
    pub cache: CacheStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_behind: Option<FlushStats>,
}

// == Repository ==
/// Caller-facing data access API.
///
/// Lookups report absence as `None`. `find_all` and `find_fresh_by_id` always
/// go to the persistent store; invalidation only ever touches the cache.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn get(&self, id: &E::Id) -> Result<Option<E>>;

    /// Every requested id that exists appears exactly once in the result.
    async fn get_all(&self, ids: &[E::Id]) -> Result<HashMap<E::Id, E>>;

    async fn find_all(&self, predicate: Option<&Predicate>) -> Result<Vec<E>>;

    async fn find_fresh_by_id(&self, id: &E::Id) -> Result<Option<E>>;

    /// Writes the entity and returns it as the repository will serve it.
    async fn put(&self, entity: E) -> Result<E>;

    async fn put_all(&self, entities: Vec<E>) -> Result<Vec<E>>;

    async fn invalidate(&self, id: &E::Id) -> Result<bool>;

    async fn invalidate_many(&self, ids: &[E::Id]) -> Result<usize>;

    async fn invalidate_all(&self) -> Result<usize>;

    async fn stats(&self) -> RepositoryStats;
}
