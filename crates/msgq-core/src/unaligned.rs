//! Records waiting for their predecessor.

use std::collections::VecDeque;

use crate::{FieldId, Timestamp, Version, entry::VectorEntry};

/// A buffered record with its arrival time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingEntry {
    /// Field the record belongs to.
    pub field: FieldId,
    /// Arrival time in seconds.
    pub arrived_at: Timestamp,
    /// The record.
    pub entry: VectorEntry,
}

impl PendingEntry {
    /// Seconds this record has been waiting at `now`.
    #[inline]
    #[must_use]
    pub const fn age(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.arrived_at)
    }
}

/// FIFO of records whose `previous` has not been accepted yet.
#[derive(Clone, Debug, Default)]
pub struct UnalignedBuffer {
    pending: VecDeque<PendingEntry>,
}

impl UnalignedBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of waiting records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is waiting.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Buffer a record.
    pub fn push(&mut self, field: FieldId, entry: VectorEntry, arrived_at: Timestamp) {
        self.pending.push_back(PendingEntry {
            field,
            arrived_at,
            entry,
        });
    }

    /// Remove and return the first record (in arrival order) that extends `version`.
    pub fn take_extending(&mut self, version: Version) -> Option<PendingEntry> {
        let position = self
            .pending
            .iter()
            .position(|pending| pending.entry.extends(version))?;
        self.pending.remove(position)
    }

    /// The largest wait among buffered records at `now`.
    #[must_use]
    pub fn oldest_age(&self, now: Timestamp) -> Option<u64> {
        self.pending.iter().map(|pending| pending.age(now)).max()
    }

    /// Iterate waiting records in arrival order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &PendingEntry> + '_ {
        self.pending.iter()
    }

    /// Drop all records and their allocation.
    pub fn release(&mut self) {
        self.pending = VecDeque::new();
    }
}
