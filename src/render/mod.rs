//! Render Service Channel
//!
//! The render service owns the actual panels: it applies power status,
//! places screens relative to each other and reports power status changes
//! back through registered callbacks.
//!
//! The coordinator only talks to it through [`RenderService`]. Calls look
//! synchronous but are always issued from one of the serialized executors,
//! never inline from a caller thread.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{Result, ScreenError};
use crate::screen::{PhysicalSurfaceId, Point};

mod simulated;

pub use simulated::SimulatedRenderService;

/// Result type for render service calls
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Render service call errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The remote call reported a failure
    #[error("Render call failed: {0}")]
    CallFailed(String),

    /// The service is not reachable
    #[error("Render service unavailable")]
    Unavailable,

    /// The service does not know the surface
    #[error("Unknown surface {0}")]
    UnknownSurface(PhysicalSurfaceId),
}

/// Panel power status as understood by the render service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerStatus {
    /// Panel on
    On,
    /// Pre-bright on
    OnAdvanced,
    /// Panel off
    Off,
    /// Pre-bright off
    OffAdvanced,
    /// Reported off while the panel is still lit (boot handoff)
    OffFake,
    /// Suspended; also the suspend acknowledgment value
    Suspend,
    /// Always-on low-power mode
    Doze,
    /// Always-on low-power mode, suspended
    DozeSuspend,
}

impl fmt::Display for PowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PowerStatus::On => "on",
            PowerStatus::OnAdvanced => "on_advanced",
            PowerStatus::Off => "off",
            PowerStatus::OffAdvanced => "off_advanced",
            PowerStatus::OffFake => "off_fake",
            PowerStatus::Suspend => "suspend",
            PowerStatus::Doze => "doze",
            PowerStatus::DozeSuspend => "doze_suspend",
        };
        f.write_str(name)
    }
}

/// A surface and where it sits in the combined desktop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenPlacement {
    /// Surface
    pub physical: PhysicalSurfaceId,
    /// Start position
    pub position: Point,
}

/// Power status reports from the render service
pub trait PowerCallback: Send + Sync {
    /// A panel finished changing power status
    fn on_power_status(&self, physical: PhysicalSurfaceId, status: PowerStatus);
}

/// Render service call channel
#[cfg_attr(test, mockall::automock)]
pub trait RenderService: Send + Sync {
    /// Apply a power status to a panel
    fn set_power_status(&self, physical: PhysicalSurfaceId, status: PowerStatus) -> RenderResult<()>;

    /// Live power status of a panel
    fn query_power_status(&self, physical: PhysicalSurfaceId) -> PowerStatus;

    /// Place two screens relative to each other
    fn set_relative_position(
        &self,
        main: ScreenPlacement,
        secondary: ScreenPlacement,
    ) -> RenderResult<()>;

    /// Register for power status reports
    fn register_power_callback(&self, callback: Arc<dyn PowerCallback>) -> RenderResult<()>;

    /// Detach a panel's compositor node
    fn detach_display_node(&self, physical: PhysicalSurfaceId) -> RenderResult<()>;
}

/// Register a power callback, retrying with a fixed delay
///
/// # Arguments
///
/// * `render` - Render service
/// * `callback` - Callback to register
/// * `attempts` - Total attempts, at least one is made
/// * `delay` - Pause between attempts
///
/// # Errors
///
/// Returns the last failure once every attempt has failed
pub fn register_with_retry(
    render: &dyn RenderService,
    callback: Arc<dyn PowerCallback>,
    attempts: u32,
    delay: Duration,
) -> Result<()> {
    let attempts = attempts.max(1);
    let mut last_error = RenderError::Unavailable;

    for attempt in 1..=attempts {
        match render.register_power_callback(Arc::clone(&callback)) {
            Ok(()) => {
                info!("Power callback registered (attempt {}/{})", attempt, attempts);
                return Ok(());
            }
            Err(e) => {
                warn!(
                    "Power callback registration failed (attempt {}/{}): {}",
                    attempt, attempts, e
                );
                last_error = e;
                if attempt < attempts {
                    thread::sleep(delay);
                }
            }
        }
    }

    Err(ScreenError::RenderServiceFailure(last_error))
}
