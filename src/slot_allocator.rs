//! Slot assignment for packed matrix buffers.
//!
//! Slots below [`SlotAllocator::active_count`] always hold valid matrices, but not
//! every one of them belongs to a live key. Removing a key leaves a hole unless it
//! owned the topmost active slot, in which case the active region shrinks by one.
//! Holes are reused before the active region grows again.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{MathError, Result};

/// Maps keys to slot indices in `0..capacity`.
#[derive(Debug, Clone)]
pub struct SlotAllocator<K> {
    capacity: usize,
    active_count: usize,
    slots: HashMap<K, usize>,
    /// Freed slots below `active_count`, most recently freed last.
    holes: Vec<usize>,
}

impl<K: Copy + Eq + Hash> SlotAllocator<K> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            active_count: 0,
            slots: HashMap::new(),
            holes: Vec::new(),
        }
    }

    /// Assigns a slot to `key`, or returns the slot it already holds.
    pub fn register(&mut self, key: K) -> Result<usize> {
        if let Some(&slot) = self.slots.get(&key) {
            return Ok(slot);
        }
        let slot = match self.holes.pop() {
            Some(hole) => hole,
            None if self.active_count < self.capacity => {
                self.active_count += 1;
                self.active_count - 1
            }
            None => {
                return Err(MathError::AllocationExhausted {
                    capacity: self.capacity,
                })
            }
        };
        self.slots.insert(key, slot);
        Ok(slot)
    }

    /// Releases the slot held by `key` and returns it.
    pub fn unregister(&mut self, key: K) -> Result<usize> {
        let slot = self.slots.remove(&key).ok_or(MathError::UnknownNode)?;
        if slot + 1 == self.active_count {
            self.active_count -= 1;
        } else {
            self.holes.push(slot);
        }
        Ok(slot)
    }

    pub fn slot_of(&self, key: K) -> Option<usize> {
        self.slots.get(&key).copied()
    }

    pub fn contains(&self, key: K) -> bool {
        self.slots.contains_key(&key)
    }

    /// Upper bound of the slots that may be referenced, holes included.
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_sequentially() {
        let mut alloc = SlotAllocator::new(4);
        assert_eq!(alloc.register('a').unwrap(), 0);
        assert_eq!(alloc.register('b').unwrap(), 1);
        assert_eq!(alloc.register('c').unwrap(), 2);
        assert_eq!(alloc.active_count(), 3);
        assert_eq!(alloc.len(), 3);
    }

    #[test]
    fn reregistering_returns_existing_slot() {
        let mut alloc = SlotAllocator::new(4);
        alloc.register(1u32).unwrap();
        alloc.register(2u32).unwrap();
        assert_eq!(alloc.register(1u32).unwrap(), 0);
        assert_eq!(alloc.active_count(), 2);
    }

    #[test]
    fn removing_from_the_middle_leaves_a_hole() {
        let mut alloc = SlotAllocator::new(4);
        for key in 0..3 {
            alloc.register(key).unwrap();
        }
        assert_eq!(alloc.unregister(1).unwrap(), 1);
        assert_eq!(alloc.active_count(), 3);
        assert_eq!(alloc.len(), 2);

        // The hole is reused before growing.
        assert_eq!(alloc.register(7).unwrap(), 1);
        assert_eq!(alloc.active_count(), 3);
        assert_eq!(alloc.register(8).unwrap(), 3);
    }

    #[test]
    fn removing_the_top_shrinks_by_exactly_one() {
        let mut alloc = SlotAllocator::new(4);
        for key in 0..3 {
            alloc.register(key).unwrap();
        }
        alloc.unregister(1).unwrap();
        alloc.unregister(2).unwrap();
        assert_eq!(alloc.active_count(), 2);

        alloc.unregister(0).unwrap();
        assert!(alloc.is_empty());
        assert_eq!(alloc.active_count(), 2);
    }

    #[test]
    fn most_recent_hole_first() {
        let mut alloc = SlotAllocator::new(8);
        for key in 0..5 {
            alloc.register(key).unwrap();
        }
        alloc.unregister(1).unwrap();
        alloc.unregister(3).unwrap();
        assert_eq!(alloc.register(10).unwrap(), 3);
        assert_eq!(alloc.register(11).unwrap(), 1);
        assert_eq!(alloc.slot_of(11), Some(1));
    }

    #[test]
    fn exhaustion_and_unknown_keys() {
        let mut alloc = SlotAllocator::new(1);
        alloc.register("first").unwrap();
        assert_eq!(
            alloc.register("second"),
            Err(MathError::AllocationExhausted { capacity: 1 })
        );
        assert_eq!(alloc.unregister("second"), Err(MathError::UnknownNode));
        assert!(!alloc.contains("second"));
        assert_eq!(alloc.capacity(), 1);
    }
}
