//! Bounded, insertion-ordered collection of field queues.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::{FieldId, Version, queue::FieldQueue};

/// Field queues keyed by field id.
///
/// Iteration follows insertion order so fetch and trim are deterministic.
/// Lookup goes through a hash index kept in sync with the ordered slots.
#[derive(Clone, Default)]
pub struct FieldTable {
    /// Queues in insertion order.
    slots: SmallVec<[(FieldId, FieldQueue); 8]>,
    /// Field id to position in `slots`.
    index: HashMap<FieldId, usize>,
    /// Maximum number of distinct fields.
    max_fields: usize,
}

impl FieldTable {
    /// Create an empty table holding at most `max_fields` fields.
    #[must_use]
    pub fn new(max_fields: usize) -> Self {
        Self {
            slots: SmallVec::new(),
            index: HashMap::with_capacity(max_fields),
            max_fields,
        }
    }

    /// Number of fields.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the table has no fields.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Check if no new field can be added.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.max_fields
    }

    /// Get the queue for a field.
    #[must_use]
    pub fn get(&self, field: FieldId) -> Option<&FieldQueue> {
        self.index.get(&field).map(|&i| &self.slots[i].1)
    }

    /// Get the queue for a field, creating it if there is room.
    ///
    /// Returns `None` when the field is unknown and the table is full.
    pub fn get_or_create(&mut self, field: FieldId) -> Option<&mut FieldQueue> {
        let position = match self.index.get(&field) {
            Some(&i) => i,
            None => {
                if self.is_full() {
                    return None;
                }
                self.slots.push((field, FieldQueue::new()));
                let i = self.slots.len() - 1;
                self.index.insert(field, i);
                i
            }
        };
        Some(&mut self.slots[position].1)
    }

    /// Iterate `(field, queue)` pairs in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (FieldId, &FieldQueue)> + '_ {
        self.slots.iter().map(|(field, queue)| (*field, queue))
    }

    /// Total records across all queues.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.slots.iter().map(|(_, queue)| queue.len()).sum()
    }

    /// Trim every queue below `threshold` and drop queues left empty.
    ///
    /// Returns the number of removed records.
    pub fn trim_below(&mut self, threshold: Version) -> usize {
        let removed: usize = self
            .slots
            .iter_mut()
            .map(|(_, queue)| queue.trim_below(threshold))
            .sum();

        let before = self.slots.len();
        self.slots.retain(|(_, queue)| !queue.is_empty());
        if self.slots.len() != before {
            self.reindex();
        }
        removed
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, (field, _)) in self.slots.iter().enumerate() {
            self.index.insert(*field, i);
        }
    }
}

impl core::fmt::Debug for FieldTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
