//! Construction-time errors.
//!
//! Folding itself never fails: every string has a well-defined folded form.
//! The only failures are malformed configurations, and they surface before
//! the first observation is processed.

use std::path::PathBuf;

use thiserror::Error;

/// A constraint, folder, profile or configuration file that cannot be built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{param} must be >= 1, got {value}")]
    NonPositiveLimit { param: &'static str, value: i64 },

    #[error("head_ratio must be strictly between 0 and 1, got {value}")]
    RatioOutOfRange { value: f64 },

    #[error("unknown profile '{name}' (expected one of: minimal, standard, power, unconstrained)")]
    UnknownProfile { name: String },

    #[error("invalid structure pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{constraint} cannot use the identity folder; it would never fit the limit")]
    IdentityFolderWithLimit { constraint: &'static str },

    #[error("'{first}' and '{second}' cannot both be set")]
    ConflictingFields {
        first: &'static str,
        second: &'static str,
    },

    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Reject limits below one, naming the parameter in the error.
pub(crate) fn positive_limit(param: &'static str, value: i64) -> Result<usize, ConfigError> {
    if value < 1 {
        return Err(ConfigError::NonPositiveLimit { param, value });
    }
    Ok(usize::try_from(value).unwrap_or(usize::MAX))
}
