//! Unified error type for the kv-migrate library.
//!
//! [`MigrateError`] is what drivers and the copy engine speak. Application
//! code that also loads configuration or installs logging can use the single
//! [`Error`] type below instead.

use thiserror::Error;

#[cfg(feature = "cli")]
use crate::config::ConfigError;
use crate::migrate::MigrateError;
#[cfg(feature = "cli")]
use crate::subscriber::LoggingError;

/// Unified error type for all kv-migrate operations.
///
/// # Example
///
/// ```ignore
/// use kv_migrate::{Result, MigrateConfig};
///
/// fn load() -> Result<MigrateConfig> {
///     Ok(MigrateConfig::from_file("migrate.toml")?)
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Error from a source, destination or the copy engine.
    #[error(transparent)]
    Migrate(#[from] MigrateError),

    /// Error loading or validating the configuration file.
    #[cfg(feature = "cli")]
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error installing the log subscriber.
    #[cfg(feature = "cli")]
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A [`Result`] type alias using the unified [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` if this is a migration error.
    pub fn is_migrate(&self) -> bool {
        matches!(self, Self::Migrate(_))
    }

    /// Returns `true` if this is a configuration error.
    #[cfg(feature = "cli")]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns `true` if this is a logging setup error.
    #[cfg(feature = "cli")]
    pub fn is_logging(&self) -> bool {
        matches!(self, Self::Logging(_))
    }

    /// Returns `true` if this is an I/O error.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
