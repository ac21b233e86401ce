//! Configuration file management for babble.
//!
//! This module handles loading and saving application configuration from TOML
//! files. Configuration is stored in the user's config directory; a missing
//! file falls back to defaults so the recorder works out of the box.

use super::paths::config_path;
use serde::{Deserialize, Serialize};
use std::fs;

/// Audio capture configuration.
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `babble list-devices`
    /// - device name from `babble list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Requested sample rate in Hz (the device's native rate wins)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            device: default_device(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BabbleConfig {
    #[serde(default)]
    pub audio: AudioConfig,
}

impl BabbleConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// A missing file yields the defaults; only a malformed file is an error.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        let config_path = config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}; using defaults",
                config_path.display()
            );
            return Ok(BabbleConfig::default());
        }
        let config_content = fs::read_to_string(&config_path)?;
        let config: BabbleConfig = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_the_system_device() {
        let config = BabbleConfig::default();
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.audio.sample_rate, 16000);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let config: BabbleConfig = toml::from_str("[audio]\ndevice = \"2\"\n").unwrap();
        assert_eq!(config.audio.device, "2");
        assert_eq!(config.audio.sample_rate, 16000);
    }

    #[test]
    fn empty_files_parse_to_defaults() {
        let config: BabbleConfig = toml::from_str("").unwrap();
        assert_eq!(config.audio.device, "default");
    }
}
