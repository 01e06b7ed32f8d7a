//! Environment parsing shared by the broker and tool configuration.
//!
//! Values are looked up through a caller-supplied function so configuration
//! can be built from the process environment at startup or from a fixed map
//! in tests.

use std::str::FromStr;

/// A configuration value was present but unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a valid {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{key} is out of range: {reason}")]
    OutOfRange { key: &'static str, reason: String },
}

/// Read `key` through `lookup`, returning `default` when unset or blank.
pub fn string_or(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse `key` through `lookup`, returning `default` when unset or blank.
pub fn parse_or<T: FromStr>(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key).map(|v| v.trim().to_string()) {
        Some(raw) if !raw.is_empty() => raw.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
            expected: std::any::type_name::<T>(),
        }),
        _ => Ok(default),
    }
}
