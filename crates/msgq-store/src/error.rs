//! Store error types.

use msgq_core::{ConfigError, Version};
use thiserror::Error;

/// Errors reported to the caller without touching any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The key holds a value of another type.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// An argument could not be parsed.
    #[error("ERR syntax error: {0}")]
    Syntax(String),

    /// A limit is out of range.
    #[error("ERR {0}")]
    Config(#[from] ConfigError),

    /// A record whose `current` version is not above its `previous`.
    #[error("ERR record version {current} must be greater than previous version {previous}")]
    NotAdvancing {
        /// Version the record claims to produce.
        current: Version,
        /// Version the record extends.
        previous: Version,
    },

    /// Negative time-to-live.
    #[error("ERR invalid expire time {0}")]
    InvalidTtl(i64),

    /// Unknown command name.
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    /// Wrong number of arguments.
    #[error("ERR wrong number of arguments for '{0}' command")]
    Arity(&'static str),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
