//! Client Notification Channel
//!
//! Fire-and-forget events for window-management clients. Each logical event
//! is handed to the general executor once and delivered to every listener
//! registered at that moment, so delivery never runs on the caller's thread
//! and never reorders events.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::Result;
use crate::executor::ExecutorHandle;
use crate::multiscreen::MultiScreenMode;
use crate::power::PowerReason;
use crate::screen::{Combination, GroupId, LogicalScreenId};

/// Display power events reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayPowerEvent {
    /// Panels turning on
    DisplayOn,
    /// Panels turning off
    DisplayOff,
    /// Entering always-on low power
    Doze,
    /// Entering suspended always-on low power
    DozeSuspend,
    /// Suspend in progress
    Suspend,
    /// A pending screen-off was canceled
    DisplayOffCanceled,
}

/// Phase of a power event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Transition started
    Begin,
    /// Transition completed
    End,
}

/// Screen connection change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenConnection {
    /// Screen created
    Connected,
    /// Screen destroyed
    Disconnected,
}

/// Kind of group membership change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupChange {
    /// Members joined
    AddToGroup,
    /// Members left
    RemoveFromGroup,
    /// Members changed role or offset
    ChangeGroup,
}

/// Event delivered to client listeners
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A screen connected or disconnected
    ScreenConnectionChanged {
        /// Screen
        id: LogicalScreenId,
        /// Change
        connection: ScreenConnection,
    },
    /// Display power progress
    PowerStatusChanged {
        /// Event
        event: DisplayPowerEvent,
        /// Phase
        status: EventStatus,
        /// Trigger
        reason: PowerReason,
    },
    /// A screen's topology role changed
    ScreenModeChanged {
        /// Screen
        id: LogicalScreenId,
        /// New role
        combination: Combination,
    },
    /// The multi-screen mode of a screen pair changed
    DisplayModeChanged {
        /// Main screen
        main: LogicalScreenId,
        /// Secondary screen
        secondary: LogicalScreenId,
        /// New mode
        mode: MultiScreenMode,
    },
    /// Group membership changed
    ScreenGroupChanged {
        /// Group
        group: GroupId,
        /// Affected screens
        ids: Vec<LogicalScreenId>,
        /// Change
        change: GroupChange,
    },
    /// Mirroring started or stopped
    CaptureStatusChanged {
        /// Whether a screen is being mirrored
        capturing: bool,
    },
}

/// Receiver of client events
pub trait ClientListener: Send + Sync {
    /// Called on the general executor, once per event
    fn on_event(&self, event: &ClientEvent);
}

/// Listener registry that delivers through the general executor
pub struct NotificationHub {
    listeners: RwLock<Vec<Arc<dyn ClientListener>>>,
    general: ExecutorHandle<()>,
}

impl NotificationHub {
    /// Create a hub delivering on `general`
    pub fn new(general: ExecutorHandle<()>) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            general,
        }
    }

    /// Add a listener
    pub fn register(&self, listener: Arc<dyn ClientListener>) {
        let mut listeners = self.listeners.write();
        listeners.push(listener);
        debug!("Registered client listener ({} total)", listeners.len());
    }

    /// Queue an event for delivery
    pub fn notify(&self, event: ClientEvent) {
        let listeners = self.listeners.read().clone();
        if listeners.is_empty() {
            return;
        }
        self.general.post(move |_| {
            for listener in &listeners {
                listener.on_event(&event);
            }
        });
    }

    /// Wait until every event queued so far has been delivered
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        self.general.submit(|_| ()).wait_timeout(timeout)
    }
}

/// Listener that logs every event
pub struct LoggingListener;

impl ClientListener for LoggingListener {
    fn on_event(&self, event: &ClientEvent) {
        match serde_json::to_string(event) {
            Ok(json) => info!("event: {}", json),
            Err(_) => info!("event: {:?}", event),
        }
    }
}

/// Listener that keeps every event in memory
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<ClientEvent>>,
}

impl EventRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far
    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().clone()
    }

    /// Forget received events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ClientListener for EventRecorder {
    fn on_event(&self, event: &ClientEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::SerialExecutor;

    #[test]
    fn test_events_are_delivered_in_order() {
        let general = SerialExecutor::new("test-notify", ()).unwrap();
        let hub = NotificationHub::new(general.handle());
        let recorder = Arc::new(EventRecorder::new());
        hub.register(recorder.clone());

        hub.notify(ClientEvent::ScreenConnectionChanged {
            id: LogicalScreenId(1),
            connection: ScreenConnection::Connected,
        });
        hub.notify(ClientEvent::CaptureStatusChanged { capturing: true });
        hub.flush(Duration::from_secs(1)).unwrap();

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            ClientEvent::ScreenConnectionChanged { id: LogicalScreenId(1), .. }
        ));
        assert_eq!(events[1], ClientEvent::CaptureStatusChanged { capturing: true });
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = ClientEvent::ScreenModeChanged {
            id: LogicalScreenId(2),
            combination: Combination::Extend,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "screen_mode_changed");
        assert_eq!(json["combination"], "extend");
    }
}
