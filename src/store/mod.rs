//! Persistent Store Module
//!
//! The narrow contract the repositories need from the durable backing store,
//! plus an in-memory reference implementation.

mod memory;
mod persistent;

pub use memory::{InMemoryStore, StoreCallCounts};
pub use persistent::{BatchOutcome, PersistentStore};
