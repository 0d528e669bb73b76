//! Repository configuration loading from file and environment variables.

use arbor_db::DbRuntimeSettings;
use serde::Deserialize;
use thiserror::Error;

/// Top-level repository configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Event journal settings.
    #[serde(default)]
    pub journal: JournalConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Event journal configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JournalConfig {
    /// Whether saves are journaled. Without a journal, observation managers
    /// report the journal as unsupported.
    #[serde(default = "default_journal_enabled")]
    pub enabled: bool,

    /// Path to the SQLite journal file, or `:memory:`.
    #[serde(default = "default_journal_path")]
    pub path: String,

    /// Busy timeout for journal connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled journal connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "arbor_observe=trace,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_journal_enabled() -> bool {
    true
}

fn default_journal_path() -> String {
    "arbor-journal.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    DbRuntimeSettings::default().busy_timeout_ms
}

fn default_pool_max_size() -> u32 {
    DbRuntimeSettings::default().pool_max_size
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: default_journal_enabled(),
            path: default_journal_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl JournalConfig {
    /// Pool settings for the journal database.
    pub fn runtime_settings(&self) -> DbRuntimeSettings {
        DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `ARBOR_JOURNAL_ENABLED` overrides `journal.enabled` ("true"/"1" or "false"/"0")
/// - `ARBOR_JOURNAL_PATH` overrides `journal.path`
/// - `ARBOR_LOG_LEVEL` overrides `logging.level`
/// - `ARBOR_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => parse_config(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Parses configuration from TOML text.
///
/// # Errors
///
/// Returns `ConfigError::Parse` for malformed TOML or mistyped keys.
pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(contents)?)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(enabled) = var("ARBOR_JOURNAL_ENABLED") {
        match enabled.as_str() {
            "true" | "1" => config.journal.enabled = true,
            "false" | "0" => config.journal.enabled = false,
            other => tracing::warn!(value = other, "ignoring invalid ARBOR_JOURNAL_ENABLED"),
        }
    }
    if let Some(path) = var("ARBOR_JOURNAL_PATH") {
        config.journal.path = path;
    }
    if let Some(level) = var("ARBOR_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("ARBOR_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
