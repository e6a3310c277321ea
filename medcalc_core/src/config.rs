//! Configuration file support for medcalc.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/medcalc/config.toml`.
//! Every section is optional.

use crate::profile::DEFAULT_HISTORY_LIMIT;
use crate::{EqualityMode, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub suggestions: SuggestionConfig,

    #[serde(default)]
    pub profile: ProfileConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// How suggestion diffs compare values
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct SuggestionConfig {
    #[serde(default)]
    pub equality: EqualityMode,
}

/// Patient profile store settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

/// Result display settings
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    /// Override every calculator's own precision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<usize>,
}

/// Interactive session settings
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Calculators mounted when a session starts
    #[serde(default)]
    pub open: Vec<String>,
}

// Default value functions
fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
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
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("medcalc").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if let Some(decimals) = self.display.decimals {
            if decimals > 6 {
                return Err(Error::Config(format!(
                    "display.decimals must be 6 or less, got {}",
                    decimals
                )));
            }
        }
        for id in &self.session.open {
            if crate::get_calculator(id).is_none() {
                return Err(Error::Config(format!(
                    "session.open lists unknown calculator '{}'",
                    id
                )));
            }
        }
        Ok(())
    }
}
