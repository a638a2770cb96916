//! Versioned multi-field message queue engine.
//!
//! A [`MessageObject`] accumulates small records that form a hash-chain-like
//! sequence: each record names the version it produces (`current`) and the
//! version it extends (`previous`). Records may arrive out of order; the
//! engine reassembles them into version-ordered per-field queues, bounds
//! memory by evicting the oldest records, and only ever exposes a gap-free
//! view.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  MessageObject                                                      │
//! │    - ChainState: vmax / vmin / vmin_full                            │
//! │    - FieldTable: field id → FieldQueue (ring buffer)                │
//! │    - UnalignedBuffer: records waiting for their predecessor         │
//! └─────────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Outcome of every append                                            │
//! │    - Ok(len): record queued or buffered                             │
//! │    - Err(NotAdvancing): record rejected, object untouched           │
//! │    - Err(Invalidated): object must be discarded                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use msgq_core::{MessageConfig, MessageObject, VectorEntry};
//!
//! let mut obj = MessageObject::new(MessageConfig::default());
//! assert_eq!(obj.append(1, VectorEntry::new(10, 0, 100), 0), Ok(1));
//!
//! // Arrives before its predecessor and waits
//! assert_eq!(obj.append(1, VectorEntry::new(30, 20, 160), 0), Ok(2));
//! // Predecessor arrives and unlocks it
//! assert_eq!(obj.append(1, VectorEntry::new(20, 10, 150), 0), Ok(3));
//! assert_eq!(obj.chain().vmax(), 30);
//! ```

mod chain;
mod config;
mod entry;
mod error;
mod layout;
mod object;
mod queue;
mod table;
mod unaligned;

pub use chain::ChainState;
pub use config::{
    DEFAULT_MAX_FIELD_LEN, DEFAULT_MAX_FIELDS, DEFAULT_MAX_UNALIGN_COUNT,
    DEFAULT_MAX_UNALIGN_TIMEOUT, MessageConfig,
};
pub use entry::VectorEntry;
pub use error::{AppendError, ConfigError, Invalidation, LayoutError};
pub use layout::{FieldSnapshot, decode_fields, encode_fields};
pub use object::MessageObject;
pub use queue::FieldQueue;
pub use table::FieldTable;
pub use unaligned::{PendingEntry, UnalignedBuffer};

/// A field identifier within a message object.
pub type FieldId = i64;

/// A record version.
pub type Version = i64;

/// Wall-clock time in seconds, used to age unaligned records.
pub type Timestamp = u64;
