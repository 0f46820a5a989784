//! Configuration System
//!
//! Handles loading client configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Persisted client state location
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_state_path")]
    pub path: String,
}

fn default_state_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("docqa").join("state.json").to_string_lossy().to_string())
        .unwrap_or_else(|| "./docqa_state.json".to_string())
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    /// Outside dev mode only errors are printed.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dev_mode: false,
        }
    }
}

/// Presentation preferences
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UiConfig {
    /// Fallback used when no theme has been saved yet
    #[serde(default)]
    pub prefers_dark: bool,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("docqa").join("config.toml")),
            Some(PathBuf::from("./docqa.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        // API overrides
        if let Ok(url) = std::env::var("DOCQA_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(timeout) = std::env::var("DOCQA_API_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.api.timeout_secs = t;
            }
        }

        // Storage overrides
        if let Ok(path) = std::env::var("DOCQA_STATE_FILE") {
            self.storage.path = path;
        }

        // Logging overrides
        if let Ok(level) = std::env::var("DOCQA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("DOCQA_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(dev) = std::env::var("DOCQA_DEV") {
            self.logging.dev_mode = parse_flag(&dev);
        }

        if let Ok(dark) = std::env::var("DOCQA_PREFERS_DARK") {
            self.ui.prefers_dark = parse_flag(&dark);
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# DocQA Client Configuration
#
# Environment variables override these settings:
# - DOCQA_API_URL
# - DOCQA_API_TIMEOUT
# - DOCQA_STATE_FILE
# - DOCQA_LOG_LEVEL
# - DOCQA_LOG_FORMAT
# - DOCQA_DEV
# - DOCQA_PREFERS_DARK

[api]
# Backend base URL
base_url = "http://localhost:8000"

# Request timeout in seconds
timeout_secs = 30

[storage]
# File holding the session token and theme preference
# path = "~/.local/share/docqa/state.json"

[logging]
# Log level used in dev mode: trace, debug, info, warn, error
level = "debug"

# Log format: pretty or json
format = "pretty"

# Print diagnostic logs (errors are always printed)
dev_mode = false

[ui]
# Theme to use before one has been chosen
prefers_dark = false
"#
    .to_string()
}
