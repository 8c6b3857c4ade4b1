//! Tiered Cache - cache-aside and write-behind data access
//!
//! Read-through, write-through and write-behind repositories composed from a
//! TTL/eviction-aware cache store and a durable persistent store, plus an HTTP
//! service exposing them over a product catalogue.

pub mod api;
pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
pub mod models;
pub mod predicate;
pub mod repository;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStore, MemoryCacheStore};
pub use config::{Config, WriteMode};
pub use entity::Entity;
pub use error::{Result, StoreError};
pub use predicate::{FieldValue, Predicate};
pub use repository::{
    CacheFailurePolicy, ReadThroughRepository, Repository, RepositoryOptions, WriteBehindConfig,
    WriteBehindRepository, WriteThroughRepository,
};
pub use store::{InMemoryStore, PersistentStore};
pub use tasks::{spawn_cleanup_task, spawn_flush_task};
