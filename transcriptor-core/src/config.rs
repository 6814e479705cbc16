//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/transcriptor/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/transcriptor/` (~/.config/transcriptor/)
//! - Data: `$XDG_DATA_HOME/transcriptor/` (~/.local/share/transcriptor/)
//! - State/Logs: `$XDG_STATE_HOME/transcriptor/` (~/.local/state/transcriptor/)

use crate::error::{Error, Result};
use crate::tools::format::{DEFAULT_TRUNCATE_CHARS, MAX_TRUNCATE_CHARS, MIN_TRUNCATE_CHARS};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tool label formatting
    #[serde(default)]
    pub display: DisplayConfig,

    /// Session defaults
    #[serde(default)]
    pub session: SessionConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Display configuration for tool labels
#[derive(Debug, Deserialize)]
pub struct DisplayConfig {
    /// Characters kept from commands and queries before the ellipsis
    #[serde(default = "default_truncate_chars")]
    pub truncate_chars: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            truncate_chars: default_truncate_chars(),
        }
    }
}

fn default_truncate_chars() -> usize {
    DEFAULT_TRUNCATE_CHARS
}

/// Session configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct SessionConfig {
    /// Model shown before the backend reports one
    pub default_model: Option<String>,

    /// Root directory of recorded session logs
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration, returning an error describing the first problem
    pub fn validate(&self) -> Result<()> {
        let chars = self.display.truncate_chars;
        if !(MIN_TRUNCATE_CHARS..=MAX_TRUNCATE_CHARS).contains(&chars) {
            return Err(Error::Config(format!(
                "display.truncate_chars must be between {} and {}, got {}",
                MIN_TRUNCATE_CHARS, MAX_TRUNCATE_CHARS, chars
            )));
        }
        if let Some(model) = &self.session.default_model {
            if model.trim().is_empty() {
                return Err(Error::Config(
                    "session.default_model must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/transcriptor/config.toml` (~/.config/transcriptor/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("transcriptor").join("config.toml")
    }

    /// Returns the data directory path
    ///
    /// `$XDG_DATA_HOME/transcriptor/` (~/.local/share/transcriptor/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("transcriptor")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/transcriptor/` (~/.local/state/transcriptor/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("transcriptor")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("transcriptor.log")
    }

    /// Directory holding recorded session logs.
    ///
    /// Uses `session.log_dir` when configured, else `$XDG_DATA_HOME/transcriptor/sessions`.
    pub fn sessions_dir(&self) -> PathBuf {
        self.session
            .log_dir
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("sessions"))
    }
}
