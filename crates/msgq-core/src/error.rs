//! Engine error types.

use thiserror::Error;

use crate::{FieldId, Version};

/// Out-of-range message object limits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `max_fields` outside `1..=255`.
    #[error("max fields must be in 1..=255, got {0}")]
    MaxFields(i64),

    /// `max_field_len` outside `1..=255`.
    #[error("max field length must be in 1..=255, got {0}")]
    MaxFieldLen(i64),
}

/// Terminal failure of a message object.
///
/// Once returned, the object can no longer guarantee a gap-free chain and
/// must be discarded by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Invalidation {
    /// A record arrived for a new field while the field table was full.
    #[error("field table full, cannot store field {field}")]
    FieldTableFull {
        /// The field that could not be stored.
        field: FieldId,
    },

    /// Too many records are waiting for a predecessor.
    #[error("{pending} unaligned records exceed limit of {limit}")]
    UnalignedOverflow {
        /// Records still buffered after reconciliation.
        pending: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A buffered record waited longer than the configured timeout.
    #[error("unaligned record waited {age}s, limit is {limit}s")]
    UnalignedTimeout {
        /// Age of the oldest offending record, in seconds.
        age: u64,
        /// Configured limit, in seconds.
        limit: u64,
    },

    /// The object was invalidated by an earlier operation.
    #[error("message object already invalidated")]
    AlreadyInvalidated,
}

/// Failure of an append.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppendError {
    /// The record does not move the version forward. Nothing was changed.
    #[error("record version {current} does not advance past {previous}")]
    NotAdvancing {
        /// Version the record claims to produce.
        current: Version,
        /// Version the record extends.
        previous: Version,
    },

    /// The append invalidated the object.
    #[error(transparent)]
    Invalidated(#[from] Invalidation),
}

/// Malformed persisted field layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Input ended in the middle of a field header.
    #[error("truncated field header at offset {offset}")]
    TruncatedHeader {
        /// Byte offset of the header.
        offset: usize,
    },

    /// Input ended before all entries of a field were read.
    #[error("field {field} declares {count} entries but input ends at offset {offset}")]
    TruncatedEntries {
        /// Field being decoded.
        field: FieldId,
        /// Declared entry count.
        count: u64,
        /// Offset of the first missing byte.
        offset: usize,
    },
}
