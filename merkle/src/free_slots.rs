//! Pool of vacated leaf slots.

use std::{cmp::Reverse, collections::BinaryHeap};

/// Min-ordered pool of slots freed by deletions.
///
/// The smallest pending slot is always reissued first, keeping the live
/// slot set as dense as possible. The pool is never persisted: it is rebuilt
/// on open from the leaf records below the size high-water mark.
#[derive(Debug, Clone, Default)]
pub struct FreeSlotPool {
    heap: BinaryHeap<Reverse<u64>>,
}

impl FreeSlotPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `slot` to the pool.
    pub fn push(&mut self, slot: u64) {
        self.heap.push(Reverse(slot));
    }

    /// Take the smallest pending slot.
    pub fn pop(&mut self) -> Option<u64> {
        self.heap.pop().map(|Reverse(slot)| slot)
    }

    /// The slot the next [`pop`](Self::pop) would return.
    pub fn peek(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(slot)| *slot)
    }

    /// Number of pending slots.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if no slot is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl FromIterator<u64> for FreeSlotPool {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        FreeSlotPool {
            heap: iter.into_iter().map(Reverse).collect(),
        }
    }
}
