//! Configuration file support for the insulin tracker.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/insulin-tracker/config.toml`,
//! or from the path in `ITRACK_CONFIG` when that variable is set.

use crate::{EntryType, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that points at an alternative config file
pub const CONFIG_ENV_VAR: &str = "ITRACK_CONFIG";

const APP_DIR: &str = "insulin-tracker";

/// Longest history window accepted, about a century
pub const MAX_HISTORY_DAYS: i64 = 36_500;

/// Administering party used when neither config nor profile names one
pub const DEFAULT_ADMINISTERED_BY: &str = "Self";

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub defaults: EntryDefaults,

    #[serde(default)]
    pub history: HistoryConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Values a fresh entry starts with
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct EntryDefaults {
    #[serde(default)]
    pub entry_type: EntryType,

    /// Falls back to the profile name, then to "Self"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administered_by: Option<String>,
}

/// History listing configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_days")]
    pub days: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            days: default_history_days(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_dir().join(".local/share"));
    base.join(APP_DIR)
}

fn default_history_days() -> i64 {
    7
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Load configuration from `ITRACK_CONFIG` or the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_dir().join(".config"));
        base.join(APP_DIR).join("config.toml")
    }

    /// The file `load` reads: `ITRACK_CONFIG` when set, else the default path
    pub fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_config_path)
    }

    /// Save the current configuration to the path `load` reads
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_HISTORY_DAYS).contains(&self.history.days) {
            return Err(Error::Config(format!(
                "history.days must be between 1 and {}, got {}",
                MAX_HISTORY_DAYS, self.history.days
            )));
        }
        if self
            .defaults
            .administered_by
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(Error::Config(
                "defaults.administered_by must not be empty".into(),
            ));
        }
        Ok(())
    }
}
