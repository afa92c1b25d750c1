//! Error types for the migration engine.

use thiserror::Error;

/// Boxed driver error kept as the `source()` of store failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while reading, filtering, or writing keys.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("store read error: {0}")]
    StoreRead(#[source] BoxError),

    #[error("store write error: {0}")]
    StoreWrite(#[source] BoxError),

    #[error("parse error for key '{key}': {reason}")]
    Parse { key: String, reason: String },

    #[error("invalid key pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot resolve type of key '{key}': {reason}")]
    TypeResolution { key: String, reason: String },

    #[error("unsupported key type '{type_name}'{}", key_suffix(.key))]
    UnsupportedType {
        key: Option<String>,
        type_name: String,
    },

    #[error("stale key handle: buffered key is {expected:?}, got '{actual}'")]
    StaleKey {
        expected: Option<String>,
        actual: String,
    },

    #[error("invalid destination prefix: prefix must not be empty")]
    InvalidPrefix,
}

fn key_suffix(key: &Option<String>) -> String {
    key.as_ref()
        .map(|k| format!(" for key '{}'", k))
        .unwrap_or_default()
}

impl MigrateError {
    /// Wrap a driver error raised while reading from a source.
    pub fn store_read(err: impl Into<BoxError>) -> Self {
        Self::StoreRead(err.into())
    }

    /// Wrap a driver error raised while writing to a destination.
    pub fn store_write(err: impl Into<BoxError>) -> Self {
        Self::StoreWrite(err.into())
    }

    /// Create a parse error for a raw row.
    pub fn parse(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Returns `true` if this is a store read error.
    pub fn is_store_read(&self) -> bool {
        matches!(self, Self::StoreRead(_))
    }

    /// Returns `true` if this is a store write error.
    pub fn is_store_write(&self) -> bool {
        matches!(self, Self::StoreWrite(_))
    }
}
