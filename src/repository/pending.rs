//! Pending Write Queue
//!
//! Coalescing buffer behind the write-behind repository. Each id moves
//! through `Idle -> Pending -> Flushing -> Idle`, or back to `Pending` when
//! its flush fails with a retryable error.

use std::collections::HashMap;

use serde::Serialize;

use crate::entity::Entity;
use crate::error::{Result, StoreError};

// == Write State ==
/// Where an id currently sits in the write-behind pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteState {
    /// Nothing buffered
    Idle,
    /// Buffered, waiting for the next flush cycle
    Pending,
    /// Handed to the persistent store by the running cycle
    Flushing,
}

// == Pending Queue ==
/// At most one pending snapshot per id; a newer write replaces an older
/// unflushed one.
///
/// Draining moves the whole pending set into the in-flight set in one step,
/// so writes arriving during a flush start a fresh pending set.
#[derive(Debug)]
pub struct PendingQueue<E: Entity> {
    pending: HashMap<E::Id, E>,
    in_flight: HashMap<E::Id, E>,
    capacity: usize,
}

impl<E: Entity> PendingQueue<E> {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: HashMap::new(),
            in_flight: HashMap::new(),
            capacity,
        }
    }

    // == Enqueue ==
    /// Buffers a snapshot, returning the one it replaced.
    ///
    /// Replacing an existing pending write never counts against capacity.
    pub fn enqueue(&mut self, entity: E) -> Result<Option<E>> {
        let id = entity.id();
        if !self.pending.contains_key(&id) && self.pending.len() >= self.capacity {
            return Err(StoreError::QueueFull {
                capacity: self.capacity,
            });
        }
        Ok(self.pending.insert(id, entity))
    }

    /// Buffers every snapshot or none of them.
    ///
    /// Returns the replaced snapshots in input order (None where the id was
    /// not pending), suitable for `restore`.
    pub fn enqueue_all(&mut self, entities: Vec<E>) -> Result<Vec<(E::Id, Option<E>)>> {
        let mut new_ids: Vec<E::Id> = Vec::new();
        for entity in &entities {
            let id = entity.id();
            if !self.pending.contains_key(&id) && !new_ids.contains(&id) {
                new_ids.push(id);
            }
        }
        if self.pending.len() + new_ids.len() > self.capacity {
            return Err(StoreError::QueueFull {
                capacity: self.capacity,
            });
        }

        Ok(entities
            .into_iter()
            .map(|entity| {
                let id = entity.id();
                let previous = self.pending.insert(id.clone(), entity);
                (id, previous)
            })
            .collect())
    }

    /// Undoes an enqueue: puts back the replaced snapshot, or removes the id.
    pub fn restore(&mut self, id: &E::Id, previous: Option<E>) {
        match previous {
            Some(entity) => {
                self.pending.insert(id.clone(), entity);
            }
            None => {
                self.pending.remove(id);
            }
        }
    }

    // == Lookup ==
    /// Newest unflushed snapshot for `id`, pending before in-flight.
    pub fn lookup(&self, id: &E::Id) -> Option<&E> {
        self.pending.get(id).or_else(|| self.in_flight.get(id))
    }

    pub fn state_of(&self, id: &E::Id) -> WriteState {
        if self.pending.contains_key(id) {
            WriteState::Pending
        } else if self.in_flight.contains_key(id) {
            WriteState::Flushing
        } else {
            WriteState::Idle
        }
    }

    // == Drain ==
    /// Swaps out the pending set and marks it in flight.
    ///
    /// Callers serialize cycles, so anything still in flight here was left
    /// by an interrupted cycle; it is returned to pending first unless a
    /// newer write superseded it.
    pub fn drain(&mut self) -> Vec<E> {
        for (id, entity) in std::mem::take(&mut self.in_flight) {
            self.pending.entry(id).or_insert(entity);
        }
        self.in_flight = std::mem::take(&mut self.pending);
        self.in_flight.values().cloned().collect()
    }

    // == Completion ==
    /// Marks the in-flight write for `id` as done.
    pub fn complete(&mut self, id: &E::Id) {
        self.in_flight.remove(id);
    }

    /// Returns a failed in-flight write to pending.
    ///
    /// Returns false if a newer write for the id is already pending, in which
    /// case the failed snapshot is discarded.
    pub fn requeue(&mut self, entity: E) -> bool {
        let id = entity.id();
        self.in_flight.remove(&id);
        if self.pending.contains_key(&id) {
            return false;
        }
        self.pending.insert(id, entity);
        true
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Product;

    fn product(id: u64, price: i64) -> Product {
        Product::new(id, format!("item-{}", id), "tools", price)
    }

    #[test]
    fn test_enqueue_coalesces_last_write_wins() {
        let mut queue = PendingQueue::new(10);

        assert_eq!(queue.enqueue(product(1, 100)).unwrap(), None);
        let replaced = queue.enqueue(product(1, 200)).unwrap();

        assert_eq!(replaced, Some(product(1, 100)));
        assert_eq!(queue.pending_len(), 1);
        assert_eq!(queue.lookup(&1).unwrap().price_cents, 200);
    }

    #[test]
    fn test_capacity_rejects_new_ids_only() {
        let mut queue = PendingQueue::new(2);
        queue.enqueue(product(1, 1)).unwrap();
        queue.enqueue(product(2, 1)).unwrap();

        assert_eq!(
            queue.enqueue(product(3, 1)),
            Err(StoreError::QueueFull { capacity: 2 })
        );
        assert!(queue.enqueue(product(2, 5)).is_ok());
    }

    #[test]
    fn test_enqueue_all_is_all_or_nothing() {
        let mut queue = PendingQueue::new(3);
        queue.enqueue(product(1, 1)).unwrap();

        let rejected = queue.enqueue_all(vec![product(2, 1), product(3, 1), product(4, 1)]);
        assert!(matches!(rejected, Err(StoreError::QueueFull { .. })));
        assert_eq!(queue.pending_len(), 1);

        let replaced = queue
            .enqueue_all(vec![product(1, 9), product(2, 1), product(2, 2)])
            .unwrap();
        assert_eq!(queue.pending_len(), 2);
        assert_eq!(replaced[0], (1, Some(product(1, 1))));
        assert_eq!(queue.lookup(&2).unwrap().price_cents, 2);
    }

    #[test]
    fn test_restore_undoes_enqueue() {
        let mut queue = PendingQueue::new(10);
        queue.enqueue(product(1, 100)).unwrap();

        let previous = queue.enqueue(product(1, 200)).unwrap();
        queue.restore(&1, previous);
        assert_eq!(queue.lookup(&1).unwrap().price_cents, 100);

        let previous = queue.enqueue(product(2, 1)).unwrap();
        queue.restore(&2, previous);
        assert_eq!(queue.state_of(&2), WriteState::Idle);
    }

    #[test]
    fn test_drain_swaps_pending_set() {
        let mut queue = PendingQueue::new(10);
        queue.enqueue(product(1, 1)).unwrap();
        queue.enqueue(product(2, 1)).unwrap();

        let batch = queue.drain();
        assert_eq!(batch.len(), 2);
        assert_eq!(queue.pending_len(), 0);
        assert_eq!(queue.state_of(&1), WriteState::Flushing);

        // Writes during the flush land in a fresh pending set
        queue.enqueue(product(1, 7)).unwrap();
        assert_eq!(queue.state_of(&1), WriteState::Pending);
        assert_eq!(queue.lookup(&1).unwrap().price_cents, 7);

        queue.complete(&1);
        queue.complete(&2);
        assert_eq!(queue.in_flight_len(), 0);
        assert_eq!(queue.drain(), vec![product(1, 7)]);
    }

    #[test]
    fn test_requeue_respects_newer_write() {
        let mut queue = PendingQueue::new(10);
        queue.enqueue(product(1, 1)).unwrap();
        queue.enqueue(product(2, 1)).unwrap();
        queue.drain();

        queue.enqueue(product(1, 5)).unwrap();

        assert!(!queue.requeue(product(1, 1)));
        assert!(queue.requeue(product(2, 1)));
        assert_eq!(queue.lookup(&1).unwrap().price_cents, 5);
        assert_eq!(queue.pending_len(), 2);
        assert_eq!(queue.in_flight_len(), 0);
    }

    #[test]
    fn test_drain_reclaims_interrupted_cycle() {
        let mut queue = PendingQueue::new(10);
        queue.enqueue(product(1, 1)).unwrap();
        queue.enqueue(product(2, 1)).unwrap();
        queue.drain();

        // Cycle abandoned without completing; a newer write for 2 arrives
        queue.enqueue(product(2, 8)).unwrap();

        let mut batch = queue.drain();
        batch.sort_by_key(|p| p.id);
        assert_eq!(batch, vec![product(1, 1), product(2, 8)]);
    }
}
