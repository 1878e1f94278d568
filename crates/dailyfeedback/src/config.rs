//! Configuration management for dailyfeedback.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::remote::DEFAULT_USER_AGENT;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "dailyfeedback";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "feedback.db";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "DAILYFEEDBACK_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `DAILYFEEDBACK_`, sections
///    separated by `__`, e.g. `DAILYFEEDBACK_REMOTE__DEFAULT_URL`)
/// 2. TOML config file at `~/.config/dailyfeedback/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Remote snapshot configuration.
    pub remote: RemoteConfig,
    /// List view configuration.
    pub view: ViewConfig,
    /// Export configuration.
    pub export: ExportConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/dailyfeedback/feedback.db`
    pub database_path: Option<PathBuf>,
}

/// Remote snapshot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// URL used when `--remote` is given without a value.
    pub default_url: Option<String>,
    /// `User-Agent` sent with every fetch.
    pub user_agent: String,
}

/// List view configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Show only today's records when no date is given.
    pub default_to_today: bool,
}

/// Export configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory export files are written to.
    /// Defaults to the current directory.
    pub output_dir: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            default_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_to_today: true,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.remote.user_agent.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "remote.user_agent must not be empty".to_string(),
            });
        }

        if let Some(url) = &self.remote.default_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::ConfigValidation {
                    message: format!("remote.default_url must be an http(s) URL: {url}"),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the export directory, resolving defaults if not set.
    #[must_use]
    pub fn export_dir(&self) -> PathBuf {
        self.export
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve a `--remote` flag: an explicit URL wins, a bare flag falls
    /// back to `remote.default_url`.
    ///
    /// Returns `Ok(None)` when the flag was not given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingUrl`] for a bare flag with no default.
    pub fn remote_url(&self, flag: Option<Option<String>>) -> Result<Option<String>> {
        match flag {
            None => Ok(None),
            Some(Some(url)) => Ok(Some(url)),
            Some(None) => self
                .remote
                .default_url
                .clone()
                .map(Some)
                .ok_or(Error::MissingUrl),
        }
    }
}
