//! Service configuration: an optional TOML file overlaid with environment
//! variables.
//!
//! A missing config file yields `Config::default()`. Environment variables
//! prefixed with [`ENV_PREFIX`] take precedence over file values. Everything
//! is read once at startup.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "NEWS_APP_FEEDS_MGMT";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// An environment variable or file value is outside its allowed range
    #[error("Configuration error: [{key}] input not allowed <{value}>")]
    InvalidValue { key: String, value: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level service configuration.
///
/// Every section uses `#[serde(default)]`, so any subset of keys can be
/// specified.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub webserver: WebserverConfig,
    pub options: OptionsConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WebserverConfig {
    pub host: String,
    pub port: u16,
}

impl Default for WebserverConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OptionsConfig {
    /// Development mode: verbose, human-oriented log output.
    pub dev_mode: bool,

    /// One of `debug`, `info`, `warning`, `error`.
    pub log_level: String,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            dev_mode: false,
            log_level: "info".to_string(),
        }
    }
}

/// Which [`FeedRepository`](crate::storage::FeedRepository) backs the API.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "memory" => Ok(Backend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: Backend,

    /// SQLite file path, or `:memory:`.
    pub path: String,

    pub max_connections: u32,

    /// How long a statement waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            path: "feeds.db".to_string(),
            max_connections: 5,
            busy_timeout_ms: 5000,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Parse a log level name as accepted in config and environment.
pub fn parse_log_level(level: &str) -> Option<Level> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Parse a boolean the way the environment and query strings spell it:
/// `1`/`t`/`true` or `0`/`f`/`false`, case-insensitive.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

/// What happened while reading the config file.
///
/// Loading runs before the subscriber is installed, so findings are kept
/// here and emitted by [`LoadReport::log`] once logging is up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// File that supplied values, if one was read.
    pub source: Option<PathBuf>,

    /// Unrecognized keys as dotted paths, e.g. `webserver.prot`.
    pub unknown_keys: Vec<String>,
}

impl LoadReport {
    pub fn log(&self) {
        match &self.source {
            Some(path) => tracing::info!(path = %path.display(), "Loaded configuration"),
            None => tracing::info!("No config file read, using defaults"),
        }
        for key in &self.unknown_keys {
            tracing::warn!(key = %key, "Unknown key in config file, ignoring");
        }
    }
}

/// Keys of `raw` that no config field consumes, as dotted paths.
pub fn unknown_keys(raw: &toml::Table) -> Vec<String> {
    let mut unknown = Vec::new();
    for (section, value) in raw {
        let known = match Config::KNOWN_KEYS
            .iter()
            .find(|(name, _)| *name == section.as_str())
        {
            Some((_, known)) => *known,
            None => {
                unknown.push(section.clone());
                continue;
            }
        };
        if let toml::Value::Table(table) = value {
            for key in table.keys() {
                if !known.contains(&key.as_str()) {
                    unknown.push(format!("{}.{}", section, key));
                }
            }
        }
    }
    unknown
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [(&'static str, &'static [&'static str]); 3] = [
        ("webserver", &["host", "port"]),
        ("options", &["dev_mode", "log_level"]),
        (
            "database",
            &["backend", "path", "max_connections", "busy_timeout_ms"],
        ),
    ];

    /// Load configuration from an optional TOML file, then apply environment
    /// overrides from the process environment.
    pub fn load(path: Option<&Path>) -> Result<(Self, LoadReport), ConfigError> {
        let (mut config, report) = match path {
            Some(path) => Self::from_file(path)?,
            None => (Self::default(), LoadReport::default()),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok((config, report))
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → defaults, no source in the report
    /// - Empty file → defaults
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown sections or keys → accepted, listed in the report
    pub fn from_file(path: &Path) -> Result<(Self, LoadReport), ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok((Self::default(), LoadReport::default()));
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let mut report = LoadReport {
            source: Some(path.to_path_buf()),
            unknown_keys: Vec::new(),
        };

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok((Self::default(), report));
        }

        let raw: toml::Table = content.parse()?;
        report.unknown_keys = unknown_keys(&raw);

        let config: Config = toml::from_str(&content)?;
        Ok((config, report))
    }

    /// Overlay values from `lookup`, which maps a full variable name to its
    /// value. Unset variables leave the current value in place.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| {
            let key = format!("{}_{}", ENV_PREFIX, suffix);
            lookup(&key).map(|value| (key, value))
        };
        let invalid = |key: String, value: String| ConfigError::InvalidValue { key, value };

        if let Some((_, value)) = get("WEBSERVER_HOST") {
            self.webserver.host = value;
        }

        if let Some((key, value)) = get("WEBSERVER_PORT") {
            self.webserver.port = match value.trim().parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => return Err(invalid(key, value)),
            };
        }

        if let Some((key, value)) = get("DEV_MODE") {
            self.options.dev_mode = parse_bool(value.trim()).ok_or_else(|| invalid(key, value))?;
        }

        if let Some((key, value)) = get("LOG_LEVEL") {
            if parse_log_level(value.trim()).is_none() {
                return Err(invalid(key, value));
            }
            self.options.log_level = value.trim().to_string();
        }

        if let Some((key, value)) = get("DATABASE_BACKEND") {
            self.database.backend = value.trim().parse().map_err(|_| invalid(key, value))?;
        }

        if let Some((_, value)) = get("DATABASE_PATH") {
            self.database.path = value;
        }

        if let Some((key, value)) = get("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = match value.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(invalid(key, value)),
            };
        }

        if let Some((key, value)) = get("DATABASE_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms =
                value.trim().parse::<u64>().map_err(|_| invalid(key, value))?;
        }

        Ok(())
    }

    /// Check values that the file format alone cannot constrain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webserver.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "webserver.port".to_string(),
                value: "0".to_string(),
            });
        }
        if parse_log_level(&self.options.log_level).is_none() {
            return Err(ConfigError::InvalidValue {
                key: "options.log_level".to_string(),
                value: self.options.log_level.clone(),
            });
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "database.max_connections".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// The configured log level; `validate` guarantees it parses.
    pub fn log_level(&self) -> Level {
        parse_log_level(&self.options.log_level).unwrap_or(Level::INFO)
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.webserver.host, self.webserver.port)
    }
}

// ============================================================================
// Tests
// ============================================================================
