//! Entity Module
//!
//! Contract every cached record type implements.

use std::fmt::Debug;
use std::hash::Hash;

use crate::predicate::FieldValue;

// == Entity ==
/// A record identified by a comparable, hashable id.
///
/// Entities are value snapshots: repositories hand out clones and never
/// share mutable state with cache internals. Changing a record means building
/// a new snapshot and writing it back.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Identifier type, used as the cache key.
    type Id: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Returns the value of a named attribute, used when evaluating predicates.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// True when the entity has not been assigned an id by the store yet.
    fn is_transient(&self) -> bool {
        false
    }

    /// Returns a copy carrying a store-generated id.
    ///
    /// Stores call this for transient entities during upsert.
    fn with_generated_id(self, _seq: u64) -> Self {
        self
    }
}
