//! Versioned records.
//!
//! # Layout
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  VectorEntry (24 bytes)                                    │
//! ├────────────────────────────────────────────────────────────┤
//! │  current: i64   (8 bytes) - version this record produces   │
//! │  previous: i64  (8 bytes) - version this record extends    │
//! │  value: i64     (8 bytes) - payload                        │
//! └────────────────────────────────────────────────────────────┘
//! ```

use bytemuck::{Pod, Zeroable};

use crate::Version;

/// A versioned record in a field chain.
///
/// Copied by value into queue storage, never aliased.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct VectorEntry {
    /// Version produced by this record.
    pub current: Version,
    /// Version this record extends.
    pub previous: Version,
    /// Payload.
    pub value: i64,
}

impl VectorEntry {
    /// Create a new record.
    #[inline]
    #[must_use]
    pub const fn new(current: Version, previous: Version, value: i64) -> Self {
        Self {
            current,
            previous,
            value,
        }
    }

    /// Returns `true` if this record directly extends `version`.
    #[inline]
    #[must_use]
    pub const fn extends(&self, version: Version) -> bool {
        self.previous == version
    }

    /// Returns `true` if the record moves the version forward.
    ///
    /// Only such records can be appended, which keeps every queue in strictly
    /// ascending version order.
    #[inline]
    #[must_use]
    pub const fn advances(&self) -> bool {
        self.current > self.previous
    }

    /// The record as a `(current, previous, value)` triple.
    #[inline]
    #[must_use]
    pub const fn as_triple(&self) -> (Version, Version, i64) {
        (self.current, self.previous, self.value)
    }
}

impl From<(Version, Version, i64)> for VectorEntry {
    fn from((current, previous, value): (Version, Version, i64)) -> Self {
        Self::new(current, previous, value)
    }
}

impl core::fmt::Display for VectorEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {} {}", self.current, self.previous, self.value)
    }
}
