//! Persistent user settings for rawhdd
//!
//! Settings are stored in a TOML configuration file at:
//! - Linux: `~/.config/rawhdd/rawhdd_config.toml`
//! - macOS: `~/Library/Application Support/rawhdd/rawhdd_config.toml`
//! - Windows: `%APPDATA%\rawhdd\rawhdd_config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! [imaging]
//! log_file = "rawhdd.log"
//! retry_attempts = 10
//!
//! [behavior]
//! skip_confirmation = false
//! quiet = false
//! ```

use crate::config::{ImagingConfig, DEFAULT_RETRY_ATTEMPTS};
use crate::log::DEFAULT_LOG_FILE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration file name
const CONFIG_FILE_NAME: &str = "rawhdd_config.toml";

/// Application name for config directory
const APP_NAME: &str = "rawhdd";

/// User settings loaded from configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Imaging settings
    pub imaging: ImagingSettings,

    /// Behavior settings
    pub behavior: BehaviorSettings,
}

/// Settings for imaging sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImagingSettings {
    /// Activity log path, appended to by every session
    pub log_file: PathBuf,

    /// Retries for a sector that fails to read
    pub retry_attempts: u32,
}

/// General behavior settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehaviorSettings {
    /// Whether to skip the confirmation prompt by default
    pub skip_confirmation: bool,

    /// Whether to suppress non-error output
    pub quiet: bool,
}

impl Default for ImagingSettings {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }
}

impl ImagingSettings {
    /// Build the runtime imaging config these settings describe
    pub fn to_config(&self) -> ImagingConfig {
        ImagingConfig::new().retry_attempts(self.retry_attempts)
    }
}

impl Settings {
    /// Load settings from the configuration file
    ///
    /// Returns default settings if the file doesn't exist or can't be parsed
    pub fn load() -> Self {
        Self::load_from_path(Self::config_path())
    }

    /// Load settings from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            tracing::debug!("No config path available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => {
                    tracing::debug!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save settings to a specific path
    pub fn save_to_path(&self, path: Option<PathBuf>) -> Result<PathBuf, SettingsError> {
        let path = path.ok_or(SettingsError::NoConfigDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let contents = toml::to_string_pretty(self).map_err(SettingsError::Serialize)?;

        std::fs::write(&path, contents).map_err(|e| SettingsError::Io {
            path: path.clone(),
            source: e,
        })?;

        tracing::info!("Saved settings to {:?}", path);
        Ok(path)
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_NAME).join(CONFIG_FILE_NAME))
    }
}

/// Errors that can occur when working with settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// No configuration directory available
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// Failed to read or write config file
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path that caused the error
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// Failed to serialize settings
    #[error("Failed to serialize settings: {0}")]
    Serialize(toml::ser::Error),
}
