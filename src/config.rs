//! Migration configuration parsing.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::migrate::{CopyOptions, ListOrder};

/// Migration configuration loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct MigrateConfig {
    /// Where keys are read from.
    pub source: SourceConfig,
    /// Where keys are written to.
    pub destination: DestinationConfig,
    /// Key name filters.
    #[serde(default)]
    pub filter: FilterConfig,
    /// Copy engine settings.
    #[serde(default)]
    pub copy: CopyConfig,
    /// Operator log settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Kind of store on either end of a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// On-disk ordered store.
    Fjall,
    /// Live key-value server.
    Redis,
}

/// Source settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub kind: StoreKind,
    /// Database directory (fjall).
    pub path: Option<PathBuf>,
    /// Keyspace to read (fjall).
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
    /// Server URL (redis).
    pub url: Option<String>,
    /// `SCAN` batch size (redis).
    #[serde(default = "default_scan_count")]
    pub scan_count: usize,
}

/// Destination settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationConfig {
    pub kind: StoreKind,
    /// Database directory (fjall).
    pub path: Option<PathBuf>,
    /// Keyspace to write (fjall).
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
    /// Server URL (redis).
    pub url: Option<String>,
    /// Prepended to every destination key name.
    pub prefix: Option<String>,
}

/// Key name filters. Empty lists disable filtering.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
}

/// Copy engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CopyConfig {
    /// `"prepend"` or `"append"`.
    #[serde(default = "default_list_order")]
    pub list_order: String,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            list_order: default_list_order(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Operator log settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `"info"` or `"kv_migrate=debug"`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// `"stdout"`, `"stderr"` or a file path.
    #[serde(default = "default_log_output")]
    pub output: String,
    #[serde(default = "default_true")]
    pub timestamps: bool,
    /// ANSI colors, only applied when writing to a terminal.
    #[serde(default = "default_true")]
    pub color: bool,
    /// Include the event target in each line.
    #[serde(default)]
    pub target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: default_log_output(),
            timestamps: true,
            color: true,
            target: false,
        }
    }
}

fn default_keyspace() -> String {
    "default".to_string()
}

fn default_scan_count() -> usize {
    1024
}

fn default_list_order() -> String {
    "prepend".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl MigrateConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().display().to_string(), e))?;
        Self::from_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field rules serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_endpoint("source", self.source.kind, &self.source.path, &self.source.url)?;
        check_endpoint(
            "destination",
            self.destination.kind,
            &self.destination.path,
            &self.destination.url,
        )?;
        if self.destination.prefix.as_deref() == Some("") {
            return Err(ConfigError::Invalid(
                "destination.prefix must not be empty".to_string(),
            ));
        }
        self.list_order()?;
        Ok(())
    }

    pub fn list_order(&self) -> Result<ListOrder, ConfigError> {
        self.copy.list_order.parse().map_err(ConfigError::Invalid)
    }

    /// Copy engine options derived from the `[copy]` section.
    pub fn copy_options(&self) -> Result<CopyOptions, ConfigError> {
        Ok(CopyOptions {
            list_order: self.list_order()?,
        })
    }
}

fn check_endpoint(
    section: &str,
    kind: StoreKind,
    path: &Option<PathBuf>,
    url: &Option<String>,
) -> Result<(), ConfigError> {
    match kind {
        StoreKind::Fjall if path.is_none() => Err(ConfigError::Invalid(format!(
            "{}.path is required for kind \"fjall\"",
            section
        ))),
        StoreKind::Redis if url.is_none() => Err(ConfigError::Invalid(format!(
            "{}.url is required for kind \"redis\"",
            section
        ))),
        _ => Ok(()),
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(String, std::io::Error),
    /// TOML parse error.
    Parse(toml::de::Error),
    /// Well-formed TOML with contradictory or missing settings.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Failed to read config file '{}': {}", path, e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(_, e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[source]
kind = "fjall"
path = "./data"
keyspace = "users"

[destination]
kind = "redis"
url = "redis://127.0.0.1:6380/0"
prefix = "ns:"

[filter]
includes = ["^user:"]
excludes = ["^user:tmp"]

[copy]
list_order = "append"

[logging]
level = "debug"
format = "json"
output = "stdout"
timestamps = false
"#;

        let config = MigrateConfig::from_str(toml).unwrap();
        assert_eq!(config.source.kind, StoreKind::Fjall);
        assert_eq!(config.source.path, Some(PathBuf::from("./data")));
        assert_eq!(config.source.keyspace, "users");
        assert_eq!(config.destination.kind, StoreKind::Redis);
        assert_eq!(config.destination.prefix.as_deref(), Some("ns:"));
        assert_eq!(config.filter.includes, vec!["^user:"]);
        assert_eq!(config.filter.excludes, vec!["^user:tmp"]);
        assert_eq!(config.list_order().unwrap(), ListOrder::Append);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.output, "stdout");
        assert!(!config.logging.timestamps);
        assert!(config.logging.color);
    }

    #[test]
    fn test_defaults() {
        let toml = r#"
[source]
kind = "redis"
url = "redis://127.0.0.1/"

[destination]
kind = "fjall"
path = "/tmp/out"
"#;

        let config = MigrateConfig::from_str(toml).unwrap();
        assert_eq!(config.source.scan_count, 1024);
        assert_eq!(config.destination.keyspace, "default");
        assert!(config.destination.prefix.is_none());
        assert!(config.filter.includes.is_empty());
        assert_eq!(config.copy_options().unwrap().list_order, ListOrder::Prepend);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.output, "stderr");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_missing_endpoint_settings() {
        let toml = r#"
[source]
kind = "fjall"

[destination]
kind = "redis"
url = "redis://127.0.0.1/"
"#;
        let err = MigrateConfig::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("source.path"));
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let toml = r#"
[source]
kind = "redis"
url = "redis://a/"

[destination]
kind = "redis"
url = "redis://b/"
prefix = ""
"#;
        assert!(matches!(
            MigrateConfig::from_str(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_bad_list_order() {
        let toml = r#"
[source]
kind = "redis"
url = "redis://a/"

[destination]
kind = "redis"
url = "redis://b/"

[copy]
list_order = "sideways"
"#;
        let err = MigrateConfig::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("sideways"));
    }

    #[test]
    fn test_unknown_kind() {
        let toml = r#"
[source]
kind = "leveldb"

[destination]
kind = "redis"
url = "redis://b/"
"#;
        assert!(matches!(
            MigrateConfig::from_str(toml),
            Err(ConfigError::Parse(_))
        ));
    }
}
