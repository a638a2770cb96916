//! Key namespace and command layer for versioned message queues.
//!
//! A [`Store`] owns a [`Namespace`] of typed values and exposes the message
//! queue operations on top of it. Message objects are created explicitly with
//! `MSGCREATE` or implicitly by the first `MSGAPPEND`, and are deleted by the
//! store as soon as the engine invalidates them.
//!
//! # Usage
//!
//! ```
//! use msgq_store::{Command, Reply, Store, StoreConfig};
//!
//! let mut store = Store::in_memory(StoreConfig::default());
//!
//! let create = Command::parse(&["MSGCREATE", "events", "2", "2", "0"]).unwrap();
//! assert_eq!(store.execute(create), Reply::Integer(1));
//!
//! let append = Command::parse(&["MSGAPPEND", "events", "1", "10", "0", "100"]).unwrap();
//! assert_eq!(store.execute(append), Reply::Integer(1));
//!
//! let len = Command::parse(&["MSGLEN", "events"]).unwrap();
//! assert_eq!(store.execute(len), Reply::Integer(1));
//! ```

mod clock;
mod command;
mod config;
mod error;
mod namespace;
mod store;

pub use clock::{Clock, ManualClock, SystemClock, secs_from_millis};
pub use command::{Command, Reply, format_entries};
pub use config::{
    ENV_DEFAULT_MAX_FIELD_LEN, ENV_DEFAULT_MAX_FIELDS, ENV_MAX_UNALIGN_COUNT,
    ENV_MAX_UNALIGN_TIMEOUT, StoreConfig,
};
pub use error::{StoreError, StoreResult};
pub use namespace::{MemoryNamespace, Namespace, Value};
pub use store::{Appended, Fetched, SharedStore, Store};
