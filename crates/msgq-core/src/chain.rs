//! Object-wide version bookkeeping.

use crate::{Version, entry::VectorEntry};

/// Chain continuity counters of a message object.
///
/// - `vmax`: `current` of the most recently accepted record. Strictly
///   increases, since accepted records extend it and advance.
/// - `vmin`: `previous` of the oldest retained record still anchoring the chain.
/// - `vmin_full`: highest `previous` among evicted records. Below it the
///   retained view has no gaps. Never decreases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainState {
    vmax: Version,
    vmin: Version,
    vmin_full: Version,
    /// Set once the first record is accepted. Version 0 is a valid version,
    /// so emptiness is not inferred from the counters.
    started: bool,
}

impl ChainState {
    /// Create the state of an object that has accepted nothing yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vmax: 0,
            vmin: 0,
            vmin_full: 0,
            started: false,
        }
    }

    /// Highest accepted version.
    #[inline]
    #[must_use]
    pub const fn vmax(&self) -> Version {
        self.vmax
    }

    /// Lowest anchoring version.
    #[inline]
    #[must_use]
    pub const fn vmin(&self) -> Version {
        self.vmin
    }

    /// Gap-free frontier.
    #[inline]
    #[must_use]
    pub const fn vmin_full(&self) -> Version {
        self.vmin_full
    }

    /// Check if no record has been accepted yet.
    #[inline]
    #[must_use]
    pub const fn is_new(&self) -> bool {
        !self.started
    }

    /// Check if `entry` can be appended without buffering.
    #[inline]
    #[must_use]
    pub const fn accepts(&self, entry: &VectorEntry) -> bool {
        self.is_new() || entry.extends(self.vmax)
    }

    /// Record that `entry` was placed in a field queue.
    pub fn advance(&mut self, entry: &VectorEntry) {
        if !self.started {
            self.vmin = entry.previous;
            self.vmin_full = entry.previous;
            self.started = true;
        }
        self.vmax = entry.current;
    }

    /// Record that `entry` was evicted from a field queue.
    pub fn evict(&mut self, entry: &VectorEntry) {
        if self.vmin == entry.previous {
            self.vmin = entry.current;
        }
        if self.vmin_full < entry.previous {
            self.vmin_full = entry.previous;
        }
    }
}
