//! Scenario Replay
//!
//! A scenario is a JSON list of hardware events, power calls and topology
//! requests, replayed in order against a [`ScreenSessionManager`].
//!
//! ```json
//! {
//!   "steps": [
//!     { "op": "connect", "physical": 0, "width": 2480, "height": 2200, "internal": true },
//!     { "op": "power", "call": "wake_up_begin", "reason": "power_key" },
//!     { "op": "connect", "physical": 7, "width": 1920, "height": 1080, "serial": "MON-1" },
//!     { "op": "set_mode", "main": 0, "secondary": 7, "mode": "extend" }
//!   ]
//! }
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::error::Result;
use crate::manager::{HardwareEvent, ScreenSessionManager};
use crate::multiscreen::{MultiScreenMode, PairPositions};
use crate::power::{DisplayState, FoldState, PowerReason, ScreenPowerState};
use crate::screen::{LogicalScreenId, PanelIdentity, PhysicalSurfaceId, ScreenProperty};

/// A scenario file
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Steps, applied in order
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Parse a scenario from JSON text
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("Failed to parse scenario")
    }

    /// Load a scenario file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid scenario {}", path.display()))
    }
}

/// One scenario step
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Panel connected
    Connect {
        /// Surface id
        physical: u64,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
        /// Built-in panel
        #[serde(default)]
        internal: bool,
        /// Panel serial number
        #[serde(default)]
        serial: String,
    },
    /// Panel disconnected
    Disconnect {
        /// Surface id
        physical: u64,
    },
    /// Hinge moved
    Fold {
        /// New hinge state
        state: FoldState,
    },
    /// Switch a pair to mirror or extend
    SetMode {
        /// Main surface
        main: u64,
        /// Secondary surface
        secondary: u64,
        /// Target mode
        mode: MultiScreenMode,
    },
    /// Place an extended pair
    SetPosition {
        /// Main surface
        main: u64,
        /// Secondary surface
        secondary: u64,
        /// Requested positions
        positions: PairPositions,
    },
    /// Move the internal role between two logical screens
    SwapInternal {
        /// Current internal screen
        internal: u64,
        /// Screen taking the role
        external: u64,
    },
    /// Create a virtual screen
    CreateVirtual {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Destroy a virtual screen
    DestroyVirtual {
        /// Logical id
        id: u64,
    },
    /// Power controller call
    Power(PowerCall),
    /// Pause the replay
    Sleep {
        /// Milliseconds
        ms: u64,
    },
}

/// Power controller calls available to scenarios
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum PowerCall {
    /// Wake started
    WakeUpBegin {
        /// Trigger
        #[serde(default)]
        reason: PowerReason,
    },
    /// Suspend started
    SuspendBegin {
        /// Trigger
        #[serde(default)]
        reason: PowerReason,
    },
    /// Enter a low-power display state
    SetDisplayState {
        /// Target state
        state: DisplayState,
    },
    /// Suspend acknowledged
    PowerCallbackEnd,
    /// Resynchronize after out-of-band power on
    SyncPowerOn,
    /// Power all screens
    SetScreenPowerForAll {
        /// On or off
        state: ScreenPowerState,
        /// Trigger
        #[serde(default)]
        reason: PowerReason,
    },
    /// Cold boot
    BootPowerOn,
    /// Cancel a pending screen-off
    CancelScreenOff,
    /// Screen-off acknowledged by the lock screen
    ScreenOffAck,
    /// Keyguard drawn
    KeyguardDrawn,
    /// Low-power result from the always-on subsystem
    LowPowerResult {
        /// Whether low power was entered
        success: bool,
    },
}

impl ScenarioStep {
    /// Apply this step, returning a one-line summary
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying operation; power calls never fail,
    /// their result is part of the summary
    pub fn apply(&self, manager: &ScreenSessionManager) -> Result<String> {
        let summary = match *self {
            ScenarioStep::Connect {
                physical,
                width,
                height,
                internal,
                ref serial,
            } => {
                let event = HardwareEvent::Connected {
                    physical: PhysicalSurfaceId(physical),
                    property: ScreenProperty::with_size(width, height),
                    identity: PanelIdentity {
                        name: format!("panel-{}", physical),
                        serial_number: serial.clone(),
                        ..PanelIdentity::default()
                    },
                    is_internal: internal,
                };
                let id = manager.handle_hardware_event(event)?;
                format!("connect P{} -> {:?}", physical, id)
            }
            ScenarioStep::Disconnect { physical } => {
                let id = manager.handle_hardware_event(HardwareEvent::Disconnected {
                    physical: PhysicalSurfaceId(physical),
                })?;
                format!("disconnect P{} ({:?})", physical, id)
            }
            ScenarioStep::Fold { state } => {
                manager.handle_hardware_event(HardwareEvent::FoldStateChanged { fold: state })?;
                format!("fold {:?}", state)
            }
            ScenarioStep::SetMode {
                main,
                secondary,
                mode,
            } => {
                let positions = manager.multiscreen().set_multi_screen_mode(
                    PhysicalSurfaceId(main),
                    PhysicalSurfaceId(secondary),
                    mode,
                )?;
                format!("{} P{} + P{} -> {:?}", mode, main, secondary, positions)
            }
            ScenarioStep::SetPosition {
                main,
                secondary,
                positions,
            } => {
                let applied = manager.multiscreen().set_relative_position(
                    PhysicalSurfaceId(main),
                    PhysicalSurfaceId(secondary),
                    positions,
                )?;
                format!("position P{} + P{} -> {:?}", main, secondary, applied)
            }
            ScenarioStep::SwapInternal { internal, external } => {
                manager
                    .multiscreen()
                    .swap_internal_role(LogicalScreenId(internal), LogicalScreenId(external))?;
                format!("internal role L{} -> L{}", internal, external)
            }
            ScenarioStep::CreateVirtual { width, height } => {
                let id = manager.create_virtual_screen(ScreenProperty::with_size(width, height))?;
                format!("virtual screen {}", id)
            }
            ScenarioStep::DestroyVirtual { id } => {
                let destroyed = manager.destroy_virtual_screen(LogicalScreenId(id));
                format!("destroy virtual L{}: {}", id, destroyed)
            }
            ScenarioStep::Power(call) => {
                let applied = call.apply(manager);
                format!("{:?}: {} (state {:?})", call, applied, manager.power().state())
            }
            ScenarioStep::Sleep { ms } => {
                thread::sleep(Duration::from_millis(ms));
                format!("slept {} ms", ms)
            }
        };
        Ok(summary)
    }
}

impl PowerCall {
    fn apply(self, manager: &ScreenSessionManager) -> bool {
        let power = manager.power();
        match self {
            PowerCall::WakeUpBegin { reason } => power.wake_up_begin(reason),
            PowerCall::SuspendBegin { reason } => power.suspend_begin(reason),
            PowerCall::SetDisplayState { state } => power.set_display_state(state),
            PowerCall::PowerCallbackEnd => power.power_callback_end(),
            PowerCall::SyncPowerOn => power.sync_power_on(),
            PowerCall::SetScreenPowerForAll { state, reason } => {
                power.set_screen_power_for_all(state, reason)
            }
            PowerCall::BootPowerOn => power.boot_power_on(),
            PowerCall::CancelScreenOff => power.cancel_screen_off(),
            PowerCall::ScreenOffAck => {
                power.notify_screen_off_ack();
                true
            }
            PowerCall::KeyguardDrawn => {
                power.notify_keyguard_drawn();
                true
            }
            PowerCall::LowPowerResult { success } => {
                power.on_low_power_result(success);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::multiscreen::MemorySettingsStore;
    use crate::power::TransitionState;
    use crate::render::SimulatedRenderService;
    use crate::screen::{Combination, Point};
    use std::sync::Arc;

    const SCENARIO: &str = r#"{
        "steps": [
            { "op": "connect", "physical": 0, "width": 2480, "height": 2200, "internal": true },
            { "op": "power", "call": "wake_up_begin", "reason": "power_key" },
            { "op": "connect", "physical": 7, "width": 1920, "height": 1080, "serial": "MON-1" },
            { "op": "set_mode", "main": 0, "secondary": 7, "mode": "extend" },
            { "op": "create_virtual", "width": 1280, "height": 720 },
            { "op": "sleep", "ms": 1 }
        ]
    }"#;

    #[test]
    fn test_replay() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        assert_eq!(scenario.steps.len(), 6);

        let manager = ScreenSessionManager::new(
            &Config::default_config(),
            Arc::new(SimulatedRenderService::new()),
            Arc::new(MemorySettingsStore::new()),
        )
        .unwrap();
        for step in &scenario.steps {
            step.apply(&manager).unwrap();
        }

        assert_eq!(manager.power().state(), Some(TransitionState::On));
        let external = manager
            .registry()
            .get_by_physical(PhysicalSurfaceId(7))
            .unwrap();
        assert_eq!(external.combination, Combination::Extend);
        assert_eq!(external.property.position, Point::new(2480, 0));
        assert_eq!(manager.registry().len(), 3);
    }

    #[test]
    fn test_failed_step_reports_error() {
        let manager = ScreenSessionManager::new(
            &Config::default_config(),
            Arc::new(SimulatedRenderService::new()),
            Arc::new(MemorySettingsStore::new()),
        )
        .unwrap();
        let step = ScenarioStep::Disconnect { physical: 3 };
        assert!(step.apply(&manager).is_err());
    }

    #[test]
    fn test_rejects_unknown_op() {
        assert!(Scenario::from_json(r#"{ "steps": [ { "op": "explode" } ] }"#).is_err());
    }
}
