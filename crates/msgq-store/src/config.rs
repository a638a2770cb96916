//! Store configuration.

use msgq_core::{
    DEFAULT_MAX_FIELD_LEN, DEFAULT_MAX_FIELDS, DEFAULT_MAX_UNALIGN_COUNT,
    DEFAULT_MAX_UNALIGN_TIMEOUT, MessageConfig,
};

/// Environment variable overriding the field limit of implicitly created objects.
pub const ENV_DEFAULT_MAX_FIELDS: &str = "MSGQ_DEFAULT_MAX_FIELDS";
/// Environment variable overriding the per-field limit of implicitly created objects.
pub const ENV_DEFAULT_MAX_FIELD_LEN: &str = "MSGQ_DEFAULT_MAX_FIELD_LEN";
/// Environment variable overriding the unaligned record limit.
pub const ENV_MAX_UNALIGN_COUNT: &str = "MSGQ_MAX_UNALIGN_COUNT";
/// Environment variable overriding the unaligned timeout, in seconds.
pub const ENV_MAX_UNALIGN_TIMEOUT: &str = "MSGQ_MAX_UNALIGN_TIMEOUT";

/// Limits applied to message objects created by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Field limits for objects created implicitly by an append.
    pub default_max_fields: i64,
    /// Per-field limit for objects created implicitly by an append.
    pub default_max_field_len: i64,
    /// Unaligned record limit for every object.
    pub max_unalign_count: usize,
    /// Unaligned timeout in seconds for every object.
    pub max_unalign_timeout: u64,
}

impl StoreConfig {
    /// Read overrides from the environment, falling back to defaults for
    /// missing or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read overrides through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let default_max_fields = lookup(ENV_DEFAULT_MAX_FIELDS)
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.default_max_fields);
        let default_max_field_len = lookup(ENV_DEFAULT_MAX_FIELD_LEN)
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.default_max_field_len);

        // Implicit limits must stay creatable
        let (default_max_fields, default_max_field_len) =
            match MessageConfig::new(default_max_fields, default_max_field_len) {
                Ok(_) => (default_max_fields, default_max_field_len),
                Err(_) => (defaults.default_max_fields, defaults.default_max_field_len),
            };

        Self {
            default_max_fields,
            default_max_field_len,
            max_unalign_count: lookup(ENV_MAX_UNALIGN_COUNT)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_unalign_count),
            max_unalign_timeout: lookup(ENV_MAX_UNALIGN_TIMEOUT)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_unalign_timeout),
        }
    }

    /// Config for an object with explicit field limits.
    pub fn message(
        &self,
        max_fields: i64,
        max_field_len: i64,
    ) -> Result<MessageConfig, msgq_core::ConfigError> {
        Ok(MessageConfig::new(max_fields, max_field_len)?
            .with_unaligned(self.max_unalign_count, self.max_unalign_timeout))
    }

    /// Config for an object created implicitly by an append.
    #[must_use]
    pub fn implicit_message(&self) -> MessageConfig {
        self.message(self.default_max_fields, self.default_max_field_len)
            .unwrap_or_else(|_| {
                MessageConfig::default()
                    .with_unaligned(self.max_unalign_count, self.max_unalign_timeout)
            })
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_max_fields: i64::from(DEFAULT_MAX_FIELDS),
            default_max_field_len: i64::from(DEFAULT_MAX_FIELD_LEN),
            max_unalign_count: DEFAULT_MAX_UNALIGN_COUNT,
            max_unalign_timeout: DEFAULT_MAX_UNALIGN_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = StoreConfig::from_lookup(|_| None);
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.implicit_message(), MessageConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = StoreConfig::from_lookup(|name| match name {
            ENV_DEFAULT_MAX_FIELDS => Some("2".into()),
            ENV_MAX_UNALIGN_COUNT => Some("10".into()),
            ENV_MAX_UNALIGN_TIMEOUT => Some("not a number".into()),
            _ => None,
        });
        assert_eq!(config.default_max_fields, 2);
        assert_eq!(config.default_max_field_len, 20);
        assert_eq!(config.max_unalign_count, 10);
        assert_eq!(config.max_unalign_timeout, 600);

        let message = config.implicit_message();
        assert_eq!(message.max_fields(), 2);
        assert_eq!(message.max_unalign_count(), 10);
    }

    #[test]
    fn test_out_of_range_implicit_limits_fall_back() {
        let config = StoreConfig::from_lookup(|name| match name {
            ENV_DEFAULT_MAX_FIELD_LEN => Some("1000".into()),
            _ => None,
        });
        assert_eq!(config.default_max_field_len, 20);
    }

    #[test]
    fn test_explicit_limits_carry_unaligned_bounds() {
        let config = StoreConfig {
            max_unalign_count: 1,
            max_unalign_timeout: 30,
            ..StoreConfig::default()
        };
        let message = config.message(3, 4).unwrap();
        assert_eq!(message.max_fields(), 3);
        assert_eq!(message.max_field_len(), 4);
        assert_eq!(message.max_unalign_count(), 1);
        assert_eq!(message.max_unalign_timeout(), 30);

        assert!(config.message(0, 4).is_err());
    }
}
