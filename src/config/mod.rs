//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - CLI arguments

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod types;

pub use types::{
    DeviceClass, DeviceConfig, LoggingConfig, MultiScreenConfig, PowerConfig, SettingsConfig,
};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Device configuration
    pub device: DeviceConfig,
    /// Power sequencing configuration
    #[serde(default)]
    pub power: PowerConfig,
    /// Multi-screen configuration
    #[serde(default)]
    pub multiscreen: MultiScreenConfig,
    /// Settings store configuration
    #[serde(default)]
    pub settings: SettingsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Config {
            device: DeviceConfig {
                class: DeviceClass::Standard,
                inner_panel: None,
                outer_panel: None,
                expand_by_default: false,
            },
            power: PowerConfig::default(),
            multiscreen: MultiScreenConfig::default(),
            settings: SettingsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("screen_on_wait_ms", self.power.screen_on_wait_ms),
            ("screen_off_wait_ms", self.power.screen_off_wait_ms),
            ("low_power_ack_timeout_ms", self.power.low_power_ack_timeout_ms),
            ("call_timeout_ms", self.power.call_timeout_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                anyhow::bail!("power.{} must be greater than zero", name);
            }
        }

        match self.device.class {
            DeviceClass::Standard => {}
            DeviceClass::Foldable | DeviceClass::DualPanel => {
                let (Some(inner), Some(outer)) = (self.device.inner_panel, self.device.outer_panel)
                else {
                    anyhow::bail!(
                        "device class {:?} requires inner_panel and outer_panel",
                        self.device.class
                    );
                };
                if inner == outer {
                    anyhow::bail!("inner_panel and outer_panel must differ (both {})", inner);
                }
            }
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(
        mut self,
        device_class: Option<DeviceClass>,
        settings_path: Option<PathBuf>,
    ) -> Self {
        if let Some(class) = device_class {
            self.device.class = class;
        }
        if let Some(path) = settings_path {
            self.settings.store_path = Some(path);
        }

        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
