//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::screen::PhysicalSurfaceId;

/// Device class, selects the power sequencing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Independent panels, powered together
    Standard,
    /// One foldable panel pair, fold state picks the active panel
    Foldable,
    /// Two panels handed over at boot (fake-off handoff)
    DualPanel,
}

/// Device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device class ("standard", "foldable", "dual_panel")
    pub class: DeviceClass,

    /// Physical id of the inner (main) panel on foldable devices
    #[serde(default)]
    pub inner_panel: Option<PhysicalSurfaceId>,

    /// Physical id of the outer (cover) panel on foldable devices
    #[serde(default)]
    pub outer_panel: Option<PhysicalSurfaceId>,

    /// Create the first screen group as EXTEND instead of MIRROR
    #[serde(default)]
    pub expand_by_default: bool,
}

/// Power sequencing timings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerConfig {
    /// Upper bound for the keyguard-drawn wait before screen on
    pub screen_on_wait_ms: u64,

    /// Upper bound for the screen-off acknowledgment wait
    pub screen_off_wait_ms: u64,

    /// Time the always-on subsystem gets to acknowledge low power
    pub low_power_ack_timeout_ms: u64,

    /// Pause between fake-off and real off during the dual-panel boot handoff
    #[serde(default = "default_fake_off_delay_ms")]
    pub fake_off_delay_ms: u64,

    /// Upper bound for a public call waiting on the power executor
    pub call_timeout_ms: u64,

    /// Attempts for the render power-callback registration
    #[serde(default = "default_register_retry_count")]
    pub register_retry_count: u32,

    /// Delay between registration attempts
    #[serde(default = "default_register_retry_delay_ms")]
    pub register_retry_delay_ms: u64,
}

fn default_fake_off_delay_ms() -> u64 {
    50
}

fn default_register_retry_count() -> u32 {
    5
}

fn default_register_retry_delay_ms() -> u64 {
    100
}

impl PowerConfig {
    /// Screen-on wait as a duration
    pub fn screen_on_wait(&self) -> Duration {
        Duration::from_millis(self.screen_on_wait_ms)
    }

    /// Screen-off wait as a duration
    pub fn screen_off_wait(&self) -> Duration {
        Duration::from_millis(self.screen_off_wait_ms)
    }

    /// Low-power acknowledgment timeout as a duration
    pub fn low_power_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.low_power_ack_timeout_ms)
    }

    /// Fake-off delay as a duration
    pub fn fake_off_delay(&self) -> Duration {
        Duration::from_millis(self.fake_off_delay_ms)
    }

    /// Call timeout as a duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Registration retry delay as a duration
    pub fn register_retry_delay(&self) -> Duration {
        Duration::from_millis(self.register_retry_delay_ms)
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            screen_on_wait_ms: 300,
            screen_off_wait_ms: 300,
            low_power_ack_timeout_ms: 3000,
            fake_off_delay_ms: default_fake_off_delay_ms(),
            call_timeout_ms: 2000,
            register_retry_count: default_register_retry_count(),
            register_retry_delay_ms: default_register_retry_delay_ms(),
        }
    }
}

/// Multi-screen configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiScreenConfig {
    /// Re-apply the persisted topology when a known panel connects
    pub restore_on_connect: bool,
}

impl Default for MultiScreenConfig {
    fn default() -> Self {
        Self {
            restore_on_connect: true,
        }
    }
}

/// Topology settings store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// TOML file for persisted topologies
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Persist to the per-user data directory when no path is given
    #[serde(default)]
    pub persist: bool,
}

impl SettingsConfig {
    /// File backing the topology store, `None` for an in-memory store
    pub fn resolved_store_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.store_path {
            return Some(path.clone());
        }
        if !self.persist {
            return None;
        }
        dirs::data_local_dir().map(|dir| dir.join("lamco-screen-coordinator").join("topology.toml"))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    pub level: String,

    /// Log file directory
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}
