//! In-process render service used by the scenario runner.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use super::{PowerCallback, PowerStatus, RenderError, RenderResult, RenderService, ScreenPlacement};
use crate::screen::{PhysicalSurfaceId, Point};

/// Render service that keeps panel state in memory
///
/// Power status changes are acknowledged immediately and reported to the
/// registered callbacks. Relative-position calls can be made to fail to
/// exercise the layout fallback.
#[derive(Default)]
pub struct SimulatedRenderService {
    statuses: Mutex<HashMap<PhysicalSurfaceId, PowerStatus>>,
    positions: Mutex<HashMap<PhysicalSurfaceId, Point>>,
    detached: Mutex<Vec<PhysicalSurfaceId>>,
    callbacks: Mutex<Vec<Arc<dyn PowerCallback>>>,
    fail_relative_position: AtomicBool,
}

impl SimulatedRenderService {
    /// Create a simulated service with no panels
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent relative-position calls fail (or succeed again)
    pub fn set_fail_relative_position(&self, fail: bool) {
        self.fail_relative_position.store(fail, Ordering::SeqCst);
    }

    /// Last position applied to a surface
    pub fn position(&self, physical: PhysicalSurfaceId) -> Option<Point> {
        self.positions.lock().get(&physical).copied()
    }

    /// Surfaces whose compositor node was detached
    pub fn detached(&self) -> Vec<PhysicalSurfaceId> {
        self.detached.lock().clone()
    }
}

impl RenderService for SimulatedRenderService {
    fn set_power_status(&self, physical: PhysicalSurfaceId, status: PowerStatus) -> RenderResult<()> {
        info!("[render] {} -> {}", physical, status);
        self.statuses.lock().insert(physical, status);

        let callbacks = self.callbacks.lock().clone();
        for callback in callbacks {
            callback.on_power_status(physical, status);
        }
        Ok(())
    }

    fn query_power_status(&self, physical: PhysicalSurfaceId) -> PowerStatus {
        self.statuses
            .lock()
            .get(&physical)
            .copied()
            .unwrap_or(PowerStatus::Off)
    }

    fn set_relative_position(
        &self,
        main: ScreenPlacement,
        secondary: ScreenPlacement,
    ) -> RenderResult<()> {
        if self.fail_relative_position.load(Ordering::SeqCst) {
            debug!("[render] relative position rejected");
            return Err(RenderError::CallFailed("set_relative_position".to_string()));
        }
        let mut positions = self.positions.lock();
        positions.insert(main.physical, main.position);
        positions.insert(secondary.physical, secondary.position);
        info!(
            "[render] {} at ({}, {}), {} at ({}, {})",
            main.physical,
            main.position.x,
            main.position.y,
            secondary.physical,
            secondary.position.x,
            secondary.position.y
        );
        Ok(())
    }

    fn register_power_callback(&self, callback: Arc<dyn PowerCallback>) -> RenderResult<()> {
        self.callbacks.lock().push(callback);
        Ok(())
    }

    fn detach_display_node(&self, physical: PhysicalSurfaceId) -> RenderResult<()> {
        info!("[render] detached node of {}", physical);
        self.detached.lock().push(physical);
        Ok(())
    }
}
