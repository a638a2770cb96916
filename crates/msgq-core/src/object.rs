//! The message object aggregate and its alignment engine.
//!
//! An incoming record takes one of two paths:
//!
//! ```text
//!                 previous == vmax (or object new)
//!   append ──────────────────────────────────────────▶ enqueue ──▶ Ok(len)
//!      │                                                  ▲
//!      │ otherwise                                        │ match on vmax
//!      ▼                                                  │
//!   unaligned buffer ──▶ reconcile sweep ─────────────────┘
//!                              │
//!                              │ table full / too many pending / too old
//!                              ▼
//!                         Invalidation (terminal)
//! ```
//!
//! While records are buffered, every append ends with a sweep, so a direct
//! append can unlock a whole run of waiting records.
//!
//! Invalidation poisons the whole object: every later append or fetch fails
//! with [`Invalidation::AlreadyInvalidated`] and the owner is expected to drop
//! it. A fetch therefore never observes a gapped or truncated chain.

use tracing::debug;

use crate::{
    FieldId, Timestamp, Version,
    chain::ChainState,
    config::MessageConfig,
    entry::VectorEntry,
    error::{AppendError, Invalidation},
    layout::FieldSnapshot,
    table::FieldTable,
    unaligned::UnalignedBuffer,
};

/// A versioned multi-field message queue.
#[derive(Clone, Debug)]
pub struct MessageObject {
    config: MessageConfig,
    chain: ChainState,
    fields: FieldTable,
    unaligned: UnalignedBuffer,
    /// Records held by the object: queued plus waiting in `unaligned`.
    len: usize,
    invalidated: bool,
}

impl MessageObject {
    /// Create an empty object.
    #[must_use]
    pub fn new(config: MessageConfig) -> Self {
        Self {
            config,
            chain: ChainState::new(),
            fields: FieldTable::new(config.max_fields()),
            unaligned: UnalignedBuffer::new(),
            len: 0,
            invalidated: false,
        }
    }

    /// Limits this object was created with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &MessageConfig {
        &self.config
    }

    /// Version bookkeeping.
    #[inline]
    #[must_use]
    pub const fn chain(&self) -> &ChainState {
        &self.chain
    }

    /// Field queues in insertion order.
    #[inline]
    #[must_use]
    pub const fn fields(&self) -> &FieldTable {
        &self.fields
    }

    /// Records waiting for a predecessor.
    #[inline]
    #[must_use]
    pub const fn unaligned(&self) -> &UnalignedBuffer {
        &self.unaligned
    }

    /// Total records held, including those waiting for a predecessor.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if the object holds no records.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if an earlier operation invalidated this object.
    #[inline]
    #[must_use]
    pub const fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// Append a record to `field`.
    ///
    /// Returns the new total length. A record whose `current` is not above
    /// its `previous` is rejected with [`AppendError::NotAdvancing`] and
    /// leaves the object untouched. [`AppendError::Invalidated`] means the
    /// object is no longer consistent and must be discarded.
    pub fn append(
        &mut self,
        field: FieldId,
        entry: VectorEntry,
        now: Timestamp,
    ) -> Result<usize, AppendError> {
        if !entry.advances() {
            return Err(AppendError::NotAdvancing {
                current: entry.current,
                previous: entry.previous,
            });
        }
        self.ensure_valid()?;

        self.len += 1;
        let result = self.place(field, entry, now);
        self.poison_on_err(result)?;
        Ok(self.len)
    }

    /// Drain buffered records that have become contiguous.
    ///
    /// Also enforces the unaligned count and age bounds.
    pub fn reconcile(&mut self, now: Timestamp) -> Result<(), Invalidation> {
        self.ensure_valid()?;
        let result = self.drain(now);
        self.poison_on_err(result)
    }

    /// Snapshot all fields for a reader that has seen up to `vbegin`.
    ///
    /// Runs a reconciliation first. Returns nothing if `vbegin` is already
    /// the newest version.
    pub fn fetch(
        &mut self,
        vbegin: Version,
        now: Timestamp,
    ) -> Result<Vec<FieldSnapshot>, Invalidation> {
        self.reconcile(now)?;

        if self.chain.vmax() == vbegin {
            return Ok(Vec::new());
        }

        Ok(self
            .fields
            .iter()
            .map(|(field, queue)| FieldSnapshot {
                field,
                entries: queue.iter().copied().collect(),
            })
            .collect())
    }

    /// Remove every queued record with `current < vbegin`.
    ///
    /// Returns the number of removed records.
    pub fn trim_by_version(&mut self, vbegin: Version) -> usize {
        let removed = self.fields.trim_below(vbegin);
        self.len -= removed;
        debug!("trimmed {removed} records below v{vbegin}");
        removed
    }

    fn ensure_valid(&self) -> Result<(), Invalidation> {
        if self.invalidated {
            Err(Invalidation::AlreadyInvalidated)
        } else {
            Ok(())
        }
    }

    fn poison_on_err(&mut self, result: Result<(), Invalidation>) -> Result<(), Invalidation> {
        if result.is_err() {
            self.invalidated = true;
        }
        result
    }

    /// Enqueue or buffer `entry`, then drain whatever it unlocked.
    fn place(
        &mut self,
        field: FieldId,
        entry: VectorEntry,
        now: Timestamp,
    ) -> Result<(), Invalidation> {
        if self.chain.accepts(&entry) {
            self.enqueue(field, entry)?;
        } else {
            self.unaligned.push(field, entry, now);
        }
        self.drain(now)
    }

    fn drain(&mut self, now: Timestamp) -> Result<(), Invalidation> {
        if self.unaligned.is_empty() {
            return Ok(());
        }
        self.sweep(now)
    }

    /// Place a chain-continuous record in its field queue.
    fn enqueue(&mut self, field: FieldId, entry: VectorEntry) -> Result<(), Invalidation> {
        let cap = self.config.max_field_len();
        let queue = self
            .fields
            .get_or_create(field)
            .ok_or(Invalidation::FieldTableFull { field })?;

        debug!(
            "enqueue field {field}: {{vc:{}, vp:{}, val:{}}}",
            entry.current, entry.previous, entry.value
        );
        let evicted = queue.push(entry, cap);
        self.chain.advance(&entry);

        if let Some(evicted) = evicted {
            debug!(
                "evict field {field}: {{vc:{}, vp:{}, val:{}}}",
                evicted.current, evicted.previous, evicted.value
            );
            self.chain.evict(&evicted);
            self.len -= 1;
        }
        Ok(())
    }

    /// Repeatedly move buffered records extending `vmax` into their queues,
    /// then check what is left against the unaligned bounds.
    fn sweep(&mut self, now: Timestamp) -> Result<(), Invalidation> {
        debug!("begin align of {} buffered records", self.unaligned.len());

        while let Some(pending) = self.unaligned.take_extending(self.chain.vmax()) {
            self.enqueue(pending.field, pending.entry)?;
            debug!(
                "aligned field {} arrived {}: v{} extends v{}",
                pending.field, pending.arrived_at, pending.entry.current, pending.entry.previous
            );
        }

        if self.unaligned.is_empty() {
            self.unaligned.release();
            return Ok(());
        }

        for pending in self.unaligned.iter() {
            debug!(
                "still unaligned field {} arrived {}: v{} extends v{}",
                pending.field, pending.arrived_at, pending.entry.current, pending.entry.previous
            );
        }

        let limit = self.config.max_unalign_timeout();
        if let Some(age) = self.unaligned.oldest_age(now).filter(|&age| age > limit) {
            return Err(Invalidation::UnalignedTimeout { age, limit });
        }

        let pending = self.unaligned.len();
        let limit = self.config.max_unalign_count();
        if pending > limit {
            return Err(Invalidation::UnalignedOverflow { pending, limit });
        }

        Ok(())
    }
}

impl Default for MessageObject {
    fn default() -> Self {
        Self::new(MessageConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(current: Version, previous: Version, value: i64) -> VectorEntry {
        VectorEntry::new(current, previous, value)
    }

    fn object(max_fields: i64, max_field_len: i64) -> MessageObject {
        MessageObject::new(MessageConfig::new(max_fields, max_field_len).unwrap())
    }

    fn triples(snapshot: &FieldSnapshot) -> Vec<(Version, Version, i64)> {
        snapshot.entries.iter().map(VectorEntry::as_triple).collect()
    }

    #[test]
    fn test_eviction_scenario() {
        let mut obj = object(2, 2);

        assert_eq!(obj.append(1, e(10, 0, 100), 0), Ok(1));
        // Does not extend vmax = 10, so it waits but still counts
        assert_eq!(obj.append(2, e(11, 0, 200), 0), Ok(2));
        assert_eq!(obj.unaligned().len(), 1);

        assert_eq!(obj.append(1, e(20, 10, 150), 0), Ok(3));
        assert_eq!(obj.chain().vmax(), 20);

        // f1 evicts (10, 0, 100), length unchanged
        assert_eq!(obj.append(1, e(30, 20, 160), 0), Ok(3));

        let fetched = obj.fetch(0, 0).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(triples(&fetched[0]), vec![(20, 10, 150), (30, 20, 160)]);
        assert_eq!(obj.unaligned().iter().next().map(|p| p.field), Some(2));
    }

    #[test]
    fn test_eviction_keeps_length() {
        let mut obj = object(2, 2);

        assert_eq!(obj.append(1, e(10, 0, 100), 0), Ok(1));
        assert_eq!(obj.append(2, e(11, 10, 200), 0), Ok(2));
        assert_eq!(obj.append(1, e(20, 11, 150), 0), Ok(3));
        assert_eq!(obj.chain().vmax(), 20);

        // f1 is at its limit, so (10, 0, 100) is evicted
        assert_eq!(obj.append(1, e(30, 20, 160), 0), Ok(3));
        assert_eq!(obj.chain().vmin(), 10);
        assert_eq!(obj.chain().vmin_full(), 0);

        let fetched = obj.fetch(0, 0).unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].field, 1);
        assert_eq!(triples(&fetched[0]), vec![(20, 11, 150), (30, 20, 160)]);
        assert_eq!(fetched[1].field, 2);
        assert_eq!(triples(&fetched[1]), vec![(11, 10, 200)]);
    }

    #[test]
    fn test_out_of_order_is_drained() {
        let mut obj = object(5, 20);

        assert_eq!(obj.append(1, e(10, 0, 100), 0), Ok(1));
        // Gap: v20 has not been seen yet
        assert_eq!(obj.append(1, e(30, 20, 160), 1), Ok(2));
        assert_eq!(obj.unaligned().len(), 1);
        assert_eq!(obj.chain().vmax(), 10);

        assert_eq!(obj.append(1, e(20, 10, 150), 2), Ok(3));
        assert!(obj.unaligned().is_empty());
        assert_eq!(obj.chain().vmax(), 30);

        let fetched = obj.fetch(0, 2).unwrap();
        assert_eq!(
            triples(&fetched[0]),
            vec![(10, 0, 100), (20, 10, 150), (30, 20, 160)]
        );
    }

    #[test]
    fn test_drain_chains_through_multiple_fields() {
        let mut obj = object(3, 20);
        obj.append(1, e(10, 0, 0), 0).unwrap();

        // Arrive in reverse order across fields
        obj.append(3, e(40, 30, 0), 0).unwrap();
        obj.append(2, e(30, 20, 0), 0).unwrap();
        assert_eq!(obj.unaligned().len(), 2);

        assert_eq!(obj.append(1, e(20, 10, 0), 0), Ok(4));
        assert!(obj.unaligned().is_empty());
        assert_eq!(obj.chain().vmax(), 40);
        assert_eq!(obj.fields().total_len(), 4);
    }

    #[test]
    fn test_capacity_exhaustion_invalidates() {
        let mut obj = object(1, 20);

        assert_eq!(obj.append(1, e(10, 0, 100), 0), Ok(1));
        assert_eq!(
            obj.append(2, e(11, 10, 200), 0),
            Err(Invalidation::FieldTableFull { field: 2 }.into())
        );
        assert!(obj.is_invalidated());

        // Terminal: nothing is accepted afterwards
        assert_eq!(
            obj.append(1, e(11, 10, 0), 0),
            Err(Invalidation::AlreadyInvalidated.into())
        );
        assert_eq!(obj.fetch(0, 0), Err(Invalidation::AlreadyInvalidated));
    }

    #[test]
    fn test_capacity_exhaustion_during_drain() {
        let mut obj = object(1, 20);
        obj.append(1, e(10, 0, 0), 0).unwrap();
        obj.append(2, e(30, 20, 0), 0).unwrap();

        // Unlocks the buffered record for field 2, which has no room
        assert_eq!(
            obj.append(1, e(20, 10, 0), 0),
            Err(Invalidation::FieldTableFull { field: 2 }.into())
        );
    }

    #[test]
    fn test_unaligned_count_bound() {
        let config = MessageConfig::default().with_unaligned(2, 600);
        let mut obj = MessageObject::new(config);
        obj.append(1, e(10, 0, 0), 0).unwrap();

        obj.append(1, e(30, 20, 0), 0).unwrap();
        obj.append(1, e(40, 30, 0), 0).unwrap();
        assert_eq!(
            obj.append(1, e(50, 40, 0), 0),
            Err(
                Invalidation::UnalignedOverflow {
                    pending: 3,
                    limit: 2
                }
                .into()
            )
        );
    }

    #[test]
    fn test_unaligned_timeout_on_append() {
        let mut obj = MessageObject::default();
        obj.append(1, e(10, 0, 0), 1000).unwrap();
        obj.append(1, e(30, 20, 0), 1000).unwrap();

        // Exactly at the limit is still fine
        assert!(obj.append(1, e(50, 40, 0), 1600).is_ok());
        assert_eq!(
            obj.append(1, e(70, 60, 0), 1601),
            Err(
                Invalidation::UnalignedTimeout {
                    age: 601,
                    limit: 600
                }
                .into()
            )
        );
    }

    #[test]
    fn test_unaligned_timeout_on_in_order_append() {
        let mut obj = MessageObject::default();
        obj.append(1, e(10, 0, 0), 1000).unwrap();
        obj.append(1, e(30, 20, 0), 1000).unwrap();

        // Extends vmax directly but cannot unlock (30, 20)
        assert_eq!(obj.append(1, e(15, 10, 0), 1600), Ok(3));
        assert_eq!(obj.chain().vmax(), 15);
        assert_eq!(
            obj.append(1, e(17, 15, 0), 1601),
            Err(
                Invalidation::UnalignedTimeout {
                    age: 601,
                    limit: 600
                }
                .into()
            )
        );
        assert!(obj.is_invalidated());
    }

    #[test]
    fn test_non_advancing_record_is_rejected_untouched() {
        let mut obj = object(2, 4);
        obj.append(1, e(10, 0, 100), 0).unwrap();
        obj.append(1, e(20, 10, 150), 0).unwrap();
        obj.append(2, e(40, 30, 0), 0).unwrap();
        let before = obj.clone();

        // Extends vmax but moves the version backwards
        assert_eq!(
            obj.append(1, e(5, 20, 0), 0),
            Err(AppendError::NotAdvancing {
                current: 5,
                previous: 20
            })
        );
        assert_eq!(
            obj.append(3, e(20, 20, 0), 0),
            Err(AppendError::NotAdvancing {
                current: 20,
                previous: 20
            })
        );
        assert!(!obj.is_invalidated());
        assert_eq!(obj.len(), before.len());
        assert_eq!(obj.chain(), before.chain());
        assert_eq!(obj.unaligned().len(), 1);
        assert_eq!(obj.fetch(0, 0), before.clone().fetch(0, 0));

        // A first record must advance too
        let mut fresh = MessageObject::default();
        assert!(fresh.append(1, e(0, 0, 0), 0).is_err());
        assert!(fresh.chain().is_new());
        assert!(fresh.is_empty());
    }

    #[test]
    fn test_trim_removes_everything_below_threshold() {
        let mut obj = object(1, 8);
        let mut previous = 0;
        for version in [10, 20, 30, 40] {
            obj.append(1, e(version, previous, 0), 0).unwrap();
            previous = version;
        }
        // Rejected, so no low version sits behind a higher one
        assert!(obj.append(1, e(5, 40, 0), 0).is_err());

        assert_eq!(obj.trim_by_version(35), 3);
        let fetched = obj.fetch(0, 0).unwrap();
        assert_eq!(triples(&fetched[0]), vec![(40, 30, 0)]);
    }

    #[test]
    fn test_unaligned_timeout_on_fetch() {
        let mut obj = MessageObject::default();
        obj.append(1, e(10, 0, 0), 0).unwrap();
        obj.append(1, e(30, 20, 0), 0).unwrap();

        assert!(obj.fetch(0, 600).is_ok());
        assert!(matches!(
            obj.fetch(0, 601),
            Err(Invalidation::UnalignedTimeout { .. })
        ));
        assert!(obj.is_invalidated());
    }

    #[test]
    fn test_fetch_up_to_date_is_empty() {
        let mut obj = MessageObject::default();
        obj.append(1, e(10, 0, 0), 0).unwrap();
        obj.append(1, e(20, 10, 0), 0).unwrap();

        assert!(obj.fetch(20, 0).unwrap().is_empty());
        assert_eq!(obj.fetch(10, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_trim_by_version() {
        let mut obj = object(3, 20);
        obj.append(1, e(10, 0, 0), 0).unwrap();
        obj.append(2, e(20, 10, 0), 0).unwrap();
        obj.append(1, e(30, 20, 0), 0).unwrap();
        obj.append(3, e(40, 30, 0), 0).unwrap();

        assert_eq!(obj.trim_by_version(25), 2);
        assert_eq!(obj.len(), 2);
        assert_eq!(obj.fields().total_len(), 2);

        let fetched = obj.fetch(0, 0).unwrap();
        let fields: Vec<_> = fetched.iter().map(|s| s.field).collect();
        assert_eq!(fields, vec![1, 3]);
        assert_eq!(triples(&fetched[0]), vec![(30, 20, 0)]);

        // Nothing left below the threshold
        assert_eq!(obj.trim_by_version(25), 0);
    }

    #[test]
    fn test_len_tracks_queues_for_continuous_chains() {
        let mut obj = object(3, 4);
        let mut previous = 0;
        for version in 1..=50 {
            let field = version % 3;
            let len = obj.append(field, e(version, previous, version), 0).unwrap();
            previous = version;

            assert_eq!(len, obj.fields().total_len());
            assert!(obj.fields().len() <= 3);
            for (_, queue) in obj.fields().iter() {
                assert!(queue.len() <= 4);
            }
        }
    }

    #[test]
    fn test_vmin_full_never_decreases() {
        let mut obj = object(2, 2);
        let mut previous = 0;
        let mut frontier = obj.chain().vmin_full();
        for version in (10..=200).step_by(10) {
            obj.append(version % 20, e(version, previous, 0), 0).unwrap();
            previous = version;

            assert!(obj.chain().vmin_full() >= frontier);
            frontier = obj.chain().vmin_full();
        }
        assert!(frontier > 0);
    }
}
