//! Shared fakes for the integration tests

#![allow(dead_code)]

use lamco_screen_coordinator::config::Config;
use lamco_screen_coordinator::multiscreen::{SettingsStore, TopologyRecord};
use lamco_screen_coordinator::render::{
    PowerCallback, PowerStatus, RenderError, RenderResult, RenderService, ScreenPlacement,
};
use lamco_screen_coordinator::screen::{PanelIdentity, PhysicalSurfaceId, ScreenProperty};
use lamco_screen_coordinator::HardwareEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub type EventLog = Arc<Mutex<Vec<String>>>;

type StatusHook = Box<dyn Fn(PhysicalSurfaceId, PowerStatus) + Send + Sync>;

/// Render service that writes every call to a shared log
#[derive(Default)]
pub struct RecordingRender {
    log: EventLog,
    statuses: Mutex<HashMap<PhysicalSurfaceId, PowerStatus>>,
    position_delay: Mutex<Duration>,
    fail_positions: AtomicBool,
    on_status: Mutex<Option<StatusHook>>,
}

impl RecordingRender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_log(log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            log,
            ..Self::default()
        })
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn status(&self, physical: PhysicalSurfaceId) -> Option<PowerStatus> {
        self.statuses.lock().unwrap().get(&physical).copied()
    }

    pub fn set_position_delay(&self, delay: Duration) {
        *self.position_delay.lock().unwrap() = delay;
    }

    pub fn fail_positions(&self, fail: bool) {
        self.fail_positions.store(fail, Ordering::SeqCst);
    }

    /// Hook run after every power status change, on the caller's thread
    pub fn on_status(&self, hook: impl Fn(PhysicalSurfaceId, PowerStatus) + Send + Sync + 'static) {
        *self.on_status.lock().unwrap() = Some(Box::new(hook));
    }
}

impl RenderService for RecordingRender {
    fn set_power_status(&self, physical: PhysicalSurfaceId, status: PowerStatus) -> RenderResult<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("power {} {}", physical, status));
        self.statuses.lock().unwrap().insert(physical, status);
        if let Some(hook) = self.on_status.lock().unwrap().as_ref() {
            hook(physical, status);
        }
        Ok(())
    }

    fn query_power_status(&self, physical: PhysicalSurfaceId) -> PowerStatus {
        self.status(physical).unwrap_or(PowerStatus::Off)
    }

    fn set_relative_position(
        &self,
        main: ScreenPlacement,
        secondary: ScreenPlacement,
    ) -> RenderResult<()> {
        let delay = *self.position_delay.lock().unwrap();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        if self.fail_positions.load(Ordering::SeqCst) {
            self.log
                .lock()
                .unwrap()
                .push(format!("position {} rejected", secondary.physical));
            return Err(RenderError::CallFailed("set_relative_position".to_string()));
        }
        self.log.lock().unwrap().push(format!(
            "position {} {} at ({}, {})",
            main.physical, secondary.physical, secondary.position.x, secondary.position.y
        ));
        Ok(())
    }

    fn register_power_callback(&self, _callback: Arc<dyn PowerCallback>) -> RenderResult<()> {
        Ok(())
    }

    fn detach_display_node(&self, physical: PhysicalSurfaceId) -> RenderResult<()> {
        self.log.lock().unwrap().push(format!("detach {}", physical));
        Ok(())
    }
}

/// Topology store that sleeps on every write and logs it
pub struct SlowStore {
    log: EventLog,
    delay: Duration,
    records: Mutex<HashMap<String, TopologyRecord>>,
}

impl SlowStore {
    pub fn new(log: EventLog, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            log,
            delay,
            records: Mutex::new(HashMap::new()),
        })
    }
}

impl SettingsStore for SlowStore {
    fn get(&self, key: &str) -> lamco_screen_coordinator::Result<Option<TopologyRecord>> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, record: TopologyRecord) -> lamco_screen_coordinator::Result<()> {
        thread::sleep(self.delay);
        self.log.lock().unwrap().push(format!("store {}", key));
        self.records.lock().unwrap().insert(key.to_string(), record);
        Ok(())
    }
}

/// Default config with short waits
pub fn fast_config() -> Config {
    let mut config = Config::default_config();
    config.power.screen_on_wait_ms = 20;
    config.power.screen_off_wait_ms = 20;
    config.power.low_power_ack_timeout_ms = 5000;
    config.power.call_timeout_ms = 2000;
    config
}

pub fn connect(physical: u64, width: u32, height: u32, serial: &str, internal: bool) -> HardwareEvent {
    HardwareEvent::Connected {
        physical: PhysicalSurfaceId(physical),
        property: ScreenProperty::with_size(width, height),
        identity: PanelIdentity {
            name: format!("panel-{}", physical),
            serial_number: serial.to_string(),
            ..PanelIdentity::default()
        },
        is_internal: internal,
    }
}

pub fn disconnect(physical: u64) -> HardwareEvent {
    HardwareEvent::Disconnected {
        physical: PhysicalSurfaceId(physical),
    }
}
