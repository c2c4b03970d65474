// Configuration management for the proxid CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/proxid/config.json
// - Linux: ~/.config/proxid/config.json
// - Windows: %APPDATA%\proxid\config.json

use anyhow::{Context, Result};
use proxid_core::ProximityConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Foreground rotation period in minutes
    pub foreground_period_minutes: u32,

    /// Foreground windows checked on each side of now
    pub foreground_nearest_radius: u32,

    /// Background rotation period in minutes
    pub background_period_minutes: u32,

    /// Background windows checked on each side of now
    pub background_nearest_radius: u32,

    /// tracing filter used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Device registry file; defaults to the data directory
    #[serde(default)]
    pub registry_path: Option<String>,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for Config {
    fn default() -> Self {
        let proximity = ProximityConfig::default();
        Self {
            foreground_period_minutes: proximity.foreground.period_minutes(),
            foreground_nearest_radius: proximity.foreground.nearest_radius(),
            background_period_minutes: proximity.background.period_minutes(),
            background_nearest_radius: proximity.background.nearest_radius(),
            log_filter: default_log_filter(),
            registry_path: None,
        }
    }
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("proxid");

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get the data directory path (cross-platform)
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to determine data directory")?
            .join("proxid");

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        Ok(data_dir)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    /// Load config from `path`, writing defaults there if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            let config: Config =
                serde_json::from_str(&contents).context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Rotation profiles described by this config
    pub fn proximity(&self) -> Result<ProximityConfig> {
        ProximityConfig::from_minutes(
            self.foreground_period_minutes,
            self.foreground_nearest_radius,
            self.background_period_minutes,
            self.background_nearest_radius,
        )
        .context("Invalid rotation settings")
    }

    /// Resolved registry file path
    pub fn registry_file(&self) -> Result<PathBuf> {
        match &self.registry_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Self::data_dir()?.join("devices.json")),
        }
    }

    /// Set a config value without persisting it.
    ///
    /// Rotation values are checked against the profile rules before they are
    /// accepted, so a saved config always builds.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.clone();
        match key {
            "foreground_period_minutes" => {
                updated.foreground_period_minutes = value.parse().context("Invalid number")?;
            }
            "foreground_nearest_radius" => {
                updated.foreground_nearest_radius = value.parse().context("Invalid number")?;
            }
            "background_period_minutes" => {
                updated.background_period_minutes = value.parse().context("Invalid number")?;
            }
            "background_nearest_radius" => {
                updated.background_nearest_radius = value.parse().context("Invalid number")?;
            }
            "log_filter" => {
                updated.log_filter = if value.is_empty() {
                    default_log_filter()
                } else {
                    value.to_string()
                };
            }
            "registry_path" => {
                updated.registry_path = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        updated.proximity()?;
        *self = updated;
        Ok(())
    }

    /// Get a config value
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "foreground_period_minutes" => Some(self.foreground_period_minutes.to_string()),
            "foreground_nearest_radius" => Some(self.foreground_nearest_radius.to_string()),
            "background_period_minutes" => Some(self.background_period_minutes.to_string()),
            "background_nearest_radius" => Some(self.background_nearest_radius.to_string()),
            "log_filter" => Some(self.log_filter.clone()),
            "registry_path" => self.registry_path.clone(),
            _ => None,
        }
    }

    /// List all config values
    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            (
                "foreground_period_minutes".to_string(),
                format!("{}m", self.foreground_period_minutes),
            ),
            (
                "foreground_nearest_radius".to_string(),
                self.foreground_nearest_radius.to_string(),
            ),
            (
                "background_period_minutes".to_string(),
                format!("{}m", self.background_period_minutes),
            ),
            (
                "background_nearest_radius".to_string(),
                self.background_nearest_radius.to_string(),
            ),
            ("log_filter".to_string(), self.log_filter.clone()),
            (
                "registry_path".to_string(),
                self.registry_path
                    .clone()
                    .unwrap_or_else(|| "(auto)".to_string()),
            ),
        ]
    }
}
