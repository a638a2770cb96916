//! Message queue operations over a namespace.
//!
//! Every operation looks up its key, rejects other value types, and hands the
//! message object to the engine. When the engine reports an invalidation the
//! key is deleted before the call returns, so no caller can observe a broken
//! chain afterwards.

use std::sync::Arc;

use msgq_core::{
    AppendError, FieldId, FieldSnapshot, Invalidation, MessageObject, VectorEntry, Version,
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    clock::{Clock, SystemClock, secs_from_millis},
    command::{Command, Reply, check_advances},
    config::StoreConfig,
    error::{StoreError, StoreResult},
    namespace::{MemoryNamespace, Namespace, Value},
};

/// Result of an append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Appended {
    /// Record accepted; total length of the object.
    Length(usize),
    /// The object was invalidated and its key deleted.
    Invalidated(Invalidation),
}

/// Result of a fetch on an existing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// Field snapshots; empty when the reader is up to date.
    Fields(Vec<FieldSnapshot>),
    /// Reconciliation invalidated the object and its key was deleted.
    Invalidated(Invalidation),
}

/// Message queue commands over a namespace.
#[derive(Debug)]
pub struct Store<N = MemoryNamespace, C = SystemClock> {
    namespace: N,
    clock: C,
    config: StoreConfig,
}

impl Store {
    /// Create an in-memory store on the system clock.
    #[must_use]
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::new(MemoryNamespace::new(), SystemClock, config)
    }
}

impl<N: Namespace, C: Clock> Store<N, C> {
    /// Create a store over `namespace`.
    pub fn new(namespace: N, clock: C, config: StoreConfig) -> Self {
        Self {
            namespace,
            clock,
            config,
        }
    }

    /// The underlying namespace.
    pub fn namespace(&self) -> &N {
        &self.namespace
    }

    /// The underlying namespace.
    pub fn namespace_mut(&mut self) -> &mut N {
        &mut self.namespace
    }

    /// The time source.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create an empty message object.
    ///
    /// Returns `false` if the key already exists. A positive `ttl_secs`
    /// schedules expiry.
    pub fn create(
        &mut self,
        key: &[u8],
        max_fields: i64,
        max_field_len: i64,
        ttl_secs: i64,
    ) -> StoreResult<bool> {
        let config = self.config.message(max_fields, max_field_len)?;
        if ttl_secs < 0 {
            return Err(StoreError::InvalidTtl(ttl_secs));
        }

        let now = self.clock.now_millis();
        if self.namespace.lookup_read(key, now).is_some() {
            return Ok(false);
        }

        self.namespace
            .create(key, Value::Message(MessageObject::new(config)));
        if ttl_secs > 0 {
            let at = now.saturating_add((ttl_secs as u64).saturating_mul(1000));
            self.namespace.set_expire(key, at);
        }
        Ok(true)
    }

    /// Append a record, creating the object with default limits if absent.
    ///
    /// A record that does not advance its version is rejected before the key
    /// is looked up or created.
    pub fn append(
        &mut self,
        key: &[u8],
        field: FieldId,
        entry: VectorEntry,
    ) -> StoreResult<Appended> {
        check_advances(&entry)?;

        let now = self.clock.now_millis();
        if self.namespace.lookup_write(key, now).is_none() {
            let config = self.config.implicit_message();
            self.namespace
                .create(key, Value::Message(MessageObject::new(config)));
        }

        let obj = self.message_mut(key, now)?.ok_or(StoreError::WrongType)?;
        match obj.append(field, entry, secs_from_millis(now)) {
            Ok(len) => Ok(Appended::Length(len)),
            Err(AppendError::NotAdvancing { current, previous }) => {
                Err(StoreError::NotAdvancing { current, previous })
            }
            Err(AppendError::Invalidated(cause)) => {
                self.invalidate(key, &cause);
                Ok(Appended::Invalidated(cause))
            }
        }
    }

    /// Append only if the key exists. Returns `None` when it does not.
    pub fn append_if_exists(
        &mut self,
        key: &[u8],
        field: FieldId,
        entry: VectorEntry,
    ) -> StoreResult<Option<Appended>> {
        check_advances(&entry)?;

        let now = self.clock.now_millis();
        if self.namespace.lookup_read(key, now).is_none() {
            return Ok(None);
        }
        self.append(key, field, entry).map(Some)
    }

    /// Total length, or `None` if the key does not exist.
    pub fn len(&mut self, key: &[u8]) -> StoreResult<Option<usize>> {
        let now = self.clock.now_millis();
        Ok(self.message_mut(key, now)?.map(|obj| obj.len()))
    }

    /// Snapshot all fields for a reader that has seen up to `vbegin`.
    ///
    /// Returns `None` if the key does not exist.
    pub fn fetch(&mut self, key: &[u8], vbegin: Version) -> StoreResult<Option<Fetched>> {
        let now = self.clock.now_millis();
        let Some(obj) = self.message_mut(key, now)? else {
            return Ok(None);
        };

        match obj.fetch(vbegin, secs_from_millis(now)) {
            Ok(fields) => Ok(Some(Fetched::Fields(fields))),
            Err(cause) => {
                self.invalidate(key, &cause);
                Ok(Some(Fetched::Invalidated(cause)))
            }
        }
    }

    /// Remove every record with `current < vbegin`.
    ///
    /// Returns the number removed, or `None` if the key does not exist.
    pub fn trim_by_version(&mut self, key: &[u8], vbegin: Version) -> StoreResult<Option<usize>> {
        let now = self.clock.now_millis();
        Ok(self
            .message_mut(key, now)?
            .map(|obj| obj.trim_by_version(vbegin)))
    }

    /// Run a parsed command and build its reply.
    pub fn execute(&mut self, command: Command) -> Reply {
        debug!("execute {command:?}");
        let result = match command {
            Command::Create {
                key,
                max_fields,
                max_field_len,
                ttl_secs,
            } => self
                .create(&key, max_fields, max_field_len, ttl_secs)
                .map(|created| Reply::Integer(i64::from(created))),
            Command::Append { key, field, entry } => {
                self.append(&key, field, entry).map(Reply::from)
            }
            Command::AppendIfExists { key, field, entry } => self
                .append_if_exists(&key, field, entry)
                .map(|appended| appended.map_or(Reply::NOT_FOUND, Reply::from)),
            Command::Len { key } => self
                .len(&key)
                .map(|len| len.map_or(Reply::NOT_FOUND, |len| Reply::Integer(len as i64))),
            Command::Fetch { key, vbegin } => self
                .fetch(&key, vbegin)
                .map(|fetched| fetched.map_or(Reply::NOT_FOUND, Reply::from)),
            Command::TrimByVersion { key, vbegin } => {
                self.trim_by_version(&key, vbegin).map(|removed| {
                    removed.map_or(Reply::NOT_FOUND, |removed| Reply::Integer(removed as i64))
                })
            }
        };
        result.unwrap_or_else(|err| Reply::Error(err.to_string()))
    }

    /// The message object under `key`.
    ///
    /// `Ok(None)` if the key is absent, `WrongType` if it holds another type.
    fn message_mut(&mut self, key: &[u8], now: u64) -> StoreResult<Option<&mut MessageObject>> {
        match self.namespace.lookup_write(key, now) {
            None => Ok(None),
            Some(value) => value.as_message_mut().map(Some).ok_or(StoreError::WrongType),
        }
    }

    fn invalidate(&mut self, key: &[u8], cause: &Invalidation) {
        warn!(
            "message key {} invalidated, deleting: {cause}",
            String::from_utf8_lossy(key)
        );
        self.namespace.delete(key);
    }
}

/// A store shared between threads.
///
/// All operations go through one mutex, which provides the single writer per
/// value the engine relies on.
pub struct SharedStore<N = MemoryNamespace, C = SystemClock> {
    inner: Arc<Mutex<Store<N, C>>>,
}

impl<N, C> Clone for SharedStore<N, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<N: Namespace, C: Clock> SharedStore<N, C> {
    /// Share `store`.
    pub fn new(store: Store<N, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Run a parsed command.
    pub fn execute(&self, command: Command) -> Reply {
        self.inner.lock().execute(command)
    }

    /// Run `f` with exclusive access to the store.
    pub fn with<R>(&self, f: impl FnOnce(&mut Store<N, C>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
