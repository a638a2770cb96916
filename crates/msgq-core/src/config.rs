//! Message object limits.

use crate::error::ConfigError;

/// Default number of distinct fields per object.
pub const DEFAULT_MAX_FIELDS: u8 = 5;

/// Default number of retained records per field.
pub const DEFAULT_MAX_FIELD_LEN: u8 = 20;

/// Default number of records allowed to wait for a predecessor.
pub const DEFAULT_MAX_UNALIGN_COUNT: usize = 3;

/// Default time a record may wait for a predecessor, in seconds.
pub const DEFAULT_MAX_UNALIGN_TIMEOUT: u64 = 10 * 60;

/// Limits fixed when a message object is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageConfig {
    max_fields: u8,
    max_field_len: u8,
    max_unalign_count: usize,
    max_unalign_timeout: u64,
}

impl MessageConfig {
    /// Create a config with the given field limits and default unaligned bounds.
    ///
    /// Both limits must be in `1..=255`.
    pub fn new(max_fields: i64, max_field_len: i64) -> Result<Self, ConfigError> {
        let max_fields = u8::try_from(max_fields)
            .ok()
            .filter(|&n| n > 0)
            .ok_or(ConfigError::MaxFields(max_fields))?;
        let max_field_len = u8::try_from(max_field_len)
            .ok()
            .filter(|&n| n > 0)
            .ok_or(ConfigError::MaxFieldLen(max_field_len))?;

        Ok(Self {
            max_fields,
            max_field_len,
            ..Self::default()
        })
    }

    /// Override the unaligned buffer bounds.
    #[must_use]
    pub const fn with_unaligned(mut self, max_count: usize, max_timeout: u64) -> Self {
        self.max_unalign_count = max_count;
        self.max_unalign_timeout = max_timeout;
        self
    }

    /// Maximum number of distinct fields.
    #[inline]
    #[must_use]
    pub const fn max_fields(&self) -> usize {
        self.max_fields as usize
    }

    /// Maximum number of retained records per field.
    #[inline]
    #[must_use]
    pub const fn max_field_len(&self) -> usize {
        self.max_field_len as usize
    }

    /// Records that may wait for a predecessor before the object is invalidated.
    #[inline]
    #[must_use]
    pub const fn max_unalign_count(&self) -> usize {
        self.max_unalign_count
    }

    /// Seconds a record may wait for a predecessor.
    #[inline]
    #[must_use]
    pub const fn max_unalign_timeout(&self) -> u64 {
        self.max_unalign_timeout
    }
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            max_fields: DEFAULT_MAX_FIELDS,
            max_field_len: DEFAULT_MAX_FIELD_LEN,
            max_unalign_count: DEFAULT_MAX_UNALIGN_COUNT,
            max_unalign_timeout: DEFAULT_MAX_UNALIGN_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MessageConfig::default();
        assert_eq!(config.max_fields(), 5);
        assert_eq!(config.max_field_len(), 20);
        assert_eq!(config.max_unalign_count(), 3);
        assert_eq!(config.max_unalign_timeout(), 600);
    }

    #[test]
    fn test_bounds() {
        assert!(MessageConfig::new(1, 1).is_ok());
        assert!(MessageConfig::new(255, 255).is_ok());
        assert_eq!(MessageConfig::new(0, 5), Err(ConfigError::MaxFields(0)));
        assert_eq!(MessageConfig::new(256, 5), Err(ConfigError::MaxFields(256)));
        assert_eq!(MessageConfig::new(5, -1), Err(ConfigError::MaxFieldLen(-1)));
    }

    #[test]
    fn test_with_unaligned_keeps_field_limits() {
        let config = MessageConfig::new(2, 3).unwrap().with_unaligned(10, 5);
        assert_eq!(config.max_fields(), 2);
        assert_eq!(config.max_field_len(), 3);
        assert_eq!(config.max_unalign_count(), 10);
        assert_eq!(config.max_unalign_timeout(), 5);
    }
}
