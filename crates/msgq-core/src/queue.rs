//! Per-field bounded ring buffer.
//!
//! Storage starts with a single slot and doubles until it reaches the field
//! length limit. From then on every push overwrites the oldest slot and hands
//! the overwritten record back to the caller for eviction bookkeeping.

use bytemuck::Zeroable;

use crate::{Version, entry::VectorEntry};

/// Slots allocated for a freshly created queue.
const INITIAL_SLOTS: usize = 1;

/// Ordered records of a single field, oldest first.
#[derive(Clone)]
pub struct FieldQueue {
    /// Ring storage. Every slot is initialized; only `count` of them are live.
    slots: Vec<VectorEntry>,
    /// Index of the oldest live record.
    head: usize,
    /// Number of live records.
    count: usize,
}

impl FieldQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: vec![VectorEntry::zeroed(); INITIAL_SLOTS],
            head: 0,
            count: 0,
        }
    }

    /// Number of live records.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Check if the queue holds no records.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Allocated slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Spare slots before the next grow or eviction.
    #[inline]
    #[must_use]
    pub fn free(&self) -> usize {
        self.slots.len() - self.count
    }

    /// The oldest record.
    #[must_use]
    pub fn front(&self) -> Option<&VectorEntry> {
        if self.count == 0 {
            None
        } else {
            Some(&self.slots[self.head])
        }
    }

    /// The newest record.
    #[must_use]
    pub fn back(&self) -> Option<&VectorEntry> {
        if self.count == 0 {
            None
        } else {
            Some(&self.slots[self.slot(self.count - 1)])
        }
    }

    /// Append a record, keeping at most `cap` records.
    ///
    /// Returns the evicted record if the queue was already at `cap`.
    pub fn push(&mut self, entry: VectorEntry, cap: usize) -> Option<VectorEntry> {
        if self.free() == 0 {
            if self.count < cap {
                self.grow((self.count * 2).clamp(1, cap));
            } else {
                // Full: overwrite the oldest slot and advance the head.
                let evicted = std::mem::replace(&mut self.slots[self.head], entry);
                self.head = (self.head + 1) % self.slots.len();
                return Some(evicted);
            }
        }

        let tail = self.slot(self.count);
        self.slots[tail] = entry;
        self.count += 1;
        None
    }

    /// Remove leading records with `current < threshold`.
    ///
    /// Returns the number of removed records. Relies on ascending storage
    /// order, so it stops at the first record at or above `threshold`.
    pub fn trim_below(&mut self, threshold: Version) -> usize {
        let mut removed = 0;
        while self.count > 0 && self.slots[self.head].current < threshold {
            self.head = (self.head + 1) % self.slots.len();
            self.count -= 1;
            removed += 1;
        }
        if self.count == 0 {
            self.head = 0;
        }
        removed
    }

    /// Iterate records oldest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &VectorEntry> + '_ {
        (0..self.count).map(move |i| &self.slots[self.slot(i)])
    }

    /// Physical slot of the `i`-th oldest record.
    #[inline]
    fn slot(&self, i: usize) -> usize {
        (self.head + i) % self.slots.len()
    }

    /// Re-layout into `new_len` slots with the oldest record at index 0.
    fn grow(&mut self, new_len: usize) {
        let mut slots = Vec::with_capacity(new_len);
        slots.extend(self.iter().copied());
        slots.resize(new_len, VectorEntry::zeroed());
        self.slots = slots;
        self.head = 0;
    }
}

impl Default for FieldQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for FieldQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
