//! Key namespace holding typed values with optional expiry.
//!
//! Expiry is lazy: a key past its deadline is removed the next time it is
//! looked up. There is no background sweeper.

use hashbrown::HashMap;
use msgq_core::MessageObject;
use tracing::trace;

/// A value stored under a key.
///
/// The variant is the type tag; commands reject keys holding another type
/// before touching them.
#[derive(Debug, Clone)]
pub enum Value {
    /// A message queue.
    Message(MessageObject),
    /// Opaque bytes owned by some other command family.
    Blob(Vec<u8>),
}

impl Value {
    /// Name of the value type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Message(_) => "msg",
            Self::Blob(_) => "string",
        }
    }

    /// The message object, if this is one.
    #[must_use]
    pub fn as_message(&self) -> Option<&MessageObject> {
        match self {
            Self::Message(obj) => Some(obj),
            Self::Blob(_) => None,
        }
    }

    /// The message object, if this is one.
    pub fn as_message_mut(&mut self) -> Option<&mut MessageObject> {
        match self {
            Self::Message(obj) => Some(obj),
            Self::Blob(_) => None,
        }
    }
}

/// The keyed store a message object lives in.
pub trait Namespace {
    /// Look up a key for reading, expiring it first if due.
    fn lookup_read(&mut self, key: &[u8], now_millis: u64) -> Option<&Value>;

    /// Look up a key for writing, expiring it first if due.
    fn lookup_write(&mut self, key: &[u8], now_millis: u64) -> Option<&mut Value>;

    /// Insert a new key. Returns `false` and leaves the namespace untouched
    /// if the key already exists.
    fn create(&mut self, key: &[u8], value: Value) -> bool;

    /// Remove a key. Returns `true` if it existed.
    fn delete(&mut self, key: &[u8]) -> bool;

    /// Schedule a key to expire at `at_millis`. Returns `false` if the key
    /// does not exist.
    fn set_expire(&mut self, key: &[u8], at_millis: u64) -> bool;

    /// Expiry deadline of a key, if any.
    fn expire_at(&self, key: &[u8]) -> Option<u64>;

    /// Number of keys, including ones not yet lazily expired.
    fn len(&self) -> usize;

    /// Check if the namespace has no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Option<u64>,
}

/// In-memory namespace.
#[derive(Debug, Clone, Default)]
pub struct MemoryNamespace {
    entries: HashMap<Box<[u8]>, Slot>,
}

impl MemoryNamespace {
    /// Create an empty namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn expire_if_due(&mut self, key: &[u8], now_millis: u64) {
        let due = self
            .entries
            .get(key)
            .and_then(|slot| slot.expires_at)
            .is_some_and(|at| at <= now_millis);
        if due {
            self.entries.remove(key);
            trace!("expired key {}", String::from_utf8_lossy(key));
        }
    }
}

impl Namespace for MemoryNamespace {
    fn lookup_read(&mut self, key: &[u8], now_millis: u64) -> Option<&Value> {
        self.expire_if_due(key, now_millis);
        self.entries.get(key).map(|slot| &slot.value)
    }

    fn lookup_write(&mut self, key: &[u8], now_millis: u64) -> Option<&mut Value> {
        self.expire_if_due(key, now_millis);
        self.entries.get_mut(key).map(|slot| &mut slot.value)
    }

    fn create(&mut self, key: &[u8], value: Value) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        trace!(
            "created {} key {}",
            value.type_name(),
            String::from_utf8_lossy(key)
        );
        self.entries.insert(
            key.into(),
            Slot {
                value,
                expires_at: None,
            },
        );
        true
    }

    fn delete(&mut self, key: &[u8]) -> bool {
        let deleted = self.entries.remove(key).is_some();
        if deleted {
            trace!("deleted key {}", String::from_utf8_lossy(key));
        }
        deleted
    }

    fn set_expire(&mut self, key: &[u8], at_millis: u64) -> bool {
        match self.entries.get_mut(key) {
            Some(slot) => {
                slot.expires_at = Some(at_millis);
                true
            }
            None => false,
        }
    }

    fn expire_at(&self, key: &[u8]) -> Option<u64> {
        self.entries.get(key).and_then(|slot| slot.expires_at)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
