//! Screen Session Manager
//!
//! Wires the identity mapper, session registry, grouping engine, power
//! controller and multi-screen coordinator together and feeds them hardware
//! events.
//!
//! # Architecture
//!
//! ```text
//! ScreenSessionManager
//!   ├─> IdentityMapper          physical <-> logical ids
//!   ├─> SessionRegistry         sessions and groups (one lock)
//!   ├─> GroupingEngine          mirror / extend / unique membership
//!   ├─> PowerController         power executor + state machine
//!   ├─> MultiScreenCoordinator  topology changes (global lock)
//!   └─> NotificationHub         client events on the general executor
//! ```
//!
//! # Threading Model
//!
//! - **Caller threads:** every public method is synchronous; hotplug and
//!   virtual screen changes hold the topology lock like mode changes do
//! - **General executor:** render position calls and client notifications
//! - **Power executor:** all render power calls, in order

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, ScreenError};
use crate::executor::SerialExecutor;
use crate::multiscreen::{MultiScreenCoordinator, SettingsStore};
use crate::notify::{ClientEvent, ClientListener, GroupChange, NotificationHub, ScreenConnection};
use crate::power::{FoldState, PowerController};
use crate::render::RenderService;
use crate::screen::{
    GroupingEngine, IdentityMapper, LogicalScreenId, PanelIdentity, PhysicalSurfaceId,
    ScreenKind, ScreenProperty, ScreenSessionGroup, SessionRegistry,
};
use crate::utils::PowerDiagnostics;

/// Virtual screens get a synthetic surface id above this base until the
/// render service reports a real one
const VIRTUAL_SURFACE_BASE: u64 = 1 << 32;

/// Hardware event feed
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareEvent {
    /// A panel was connected
    Connected {
        /// Surface id from the driver
        physical: PhysicalSurfaceId,
        /// Geometry
        property: ScreenProperty,
        /// Identity fields
        identity: PanelIdentity,
        /// Built-in panel
        is_internal: bool,
    },
    /// A panel was disconnected
    Disconnected {
        /// Surface id from the driver
        physical: PhysicalSurfaceId,
    },
    /// The hinge moved
    FoldStateChanged {
        /// New hinge state
        fold: FoldState,
    },
}

/// Owner of all screen coordination components
pub struct ScreenSessionManager {
    registry: Arc<SessionRegistry>,
    grouping: Arc<GroupingEngine>,
    power: PowerController,
    multiscreen: MultiScreenCoordinator,
    notifier: Arc<NotificationHub>,
    restore_on_connect: bool,
    general: SerialExecutor<()>,
}

impl ScreenSessionManager {
    /// Create the manager and start its executors
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `render` - Render service channel
    /// * `settings` - Topology store
    ///
    /// # Errors
    ///
    /// Returns error if an executor cannot be started
    pub fn new(
        config: &Config,
        render: Arc<dyn RenderService>,
        settings: Arc<dyn SettingsStore>,
    ) -> Result<Self> {
        info!("Initializing screen session manager");

        let general = SerialExecutor::new("general", ())?;
        let notifier = Arc::new(NotificationHub::new(general.handle()));
        let mapper = Arc::new(IdentityMapper::new());
        let registry = Arc::new(SessionRegistry::new(mapper));
        let grouping = Arc::new(GroupingEngine::new(
            Arc::clone(&registry),
            config.device.expand_by_default,
        ));

        let power = PowerController::new(
            Arc::clone(&render),
            Arc::clone(&registry),
            Arc::clone(&notifier),
            Arc::new(PowerDiagnostics::new()),
            &config.device,
            &config.power,
        )?;

        let multiscreen = MultiScreenCoordinator::new(
            Arc::clone(&grouping),
            render,
            general.handle(),
            Arc::clone(&notifier),
            settings,
            config.power.call_timeout(),
        );

        info!("Screen session manager initialized");
        Ok(Self {
            registry,
            grouping,
            power,
            multiscreen,
            notifier,
            restore_on_connect: config.multiscreen.restore_on_connect,
            general,
        })
    }

    /// Register with the render service for power reports
    pub fn start(&self) -> Result<()> {
        self.power.register_render_callback()
    }

    /// Apply one hardware event
    ///
    /// Returns the logical screen the event concerned, if any.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateConnect` for a second connect of an in-use panel and
    /// `PhysicalNotFound` for a disconnect of an unknown surface
    pub fn handle_hardware_event(&self, event: HardwareEvent) -> Result<Option<LogicalScreenId>> {
        match event {
            HardwareEvent::Connected {
                physical,
                property,
                identity,
                is_internal,
            } => self.on_connected(physical, property, identity, is_internal).map(Some),
            HardwareEvent::Disconnected { physical } => self.on_disconnected(physical).map(Some),
            HardwareEvent::FoldStateChanged { fold } => {
                info!("Fold state changed to {:?}", fold);
                self.power.set_fold_state(fold);
                Ok(None)
            }
        }
    }

    fn on_connected(
        &self,
        physical: PhysicalSurfaceId,
        property: ScreenProperty,
        identity: PanelIdentity,
        is_internal: bool,
    ) -> Result<LogicalScreenId> {
        let _topology = self.multiscreen.lock_topology();
        let session = self.registry.create(physical, ScreenKind::Real, property)?;
        let id = session.id;
        self.registry.update(id, |s| {
            s.identity = identity;
            s.is_internal = is_internal;
        });
        info!("Connected {} as {}{}", physical, id, if is_internal { " (internal)" } else { "" });

        if let Some(group) = self.grouping.add_to_group(id, false) {
            self.notify_group(&group, vec![id], GroupChange::AddToGroup);
        }
        self.notifier.notify(ClientEvent::ScreenConnectionChanged {
            id,
            connection: ScreenConnection::Connected,
        });

        if self.restore_on_connect && !is_internal {
            match self.multiscreen.restore_topology_locked(physical) {
                Ok(Some(mode)) => info!("Restored {} for {}", mode, id),
                Ok(None) => {}
                Err(e) => warn!("Topology restore for {} failed: {}", id, e),
            }
        }
        Ok(id)
    }

    fn on_disconnected(&self, physical: PhysicalSurfaceId) -> Result<LogicalScreenId> {
        let _topology = self.multiscreen.lock_topology();
        let session = self
            .registry
            .get_by_physical(physical)
            .ok_or(ScreenError::PhysicalNotFound(physical))?;
        let id = session.id;

        if let Some(group) = self.grouping.remove_from_group(id) {
            self.notify_group(&group, vec![id], GroupChange::RemoveFromGroup);
            if group.is_empty() {
                debug!("Group {} deleted with its last member", group.id);
            } else {
                self.multiscreen.revert_after_disconnect_locked(&group);
            }
        }

        self.registry.remove(id);
        self.registry.mapper().release(id);
        self.notifier.notify(ClientEvent::ScreenConnectionChanged {
            id,
            connection: ScreenConnection::Disconnected,
        });
        info!("Disconnected {} ({})", physical, id);
        Ok(id)
    }

    /// Create a virtual screen in its own UNIQUE group
    ///
    /// # Errors
    ///
    /// Returns error if the synthetic surface is already in use
    pub fn create_virtual_screen(&self, property: ScreenProperty) -> Result<LogicalScreenId> {
        let _topology = self.multiscreen.lock_topology();
        let mapper = self.registry.mapper();
        let id = mapper.allocate_unbound();
        let surface = PhysicalSurfaceId(VIRTUAL_SURFACE_BASE + id.0);
        mapper.bind(surface, id);

        let session = match self.registry.create(surface, ScreenKind::Virtual, property) {
            Ok(session) => session,
            Err(e) => {
                mapper.release(id);
                return Err(e);
            }
        };
        if let Some(group) = self.grouping.add_to_group(session.id, true) {
            self.notify_group(&group, vec![session.id], GroupChange::AddToGroup);
        }
        self.notifier.notify(ClientEvent::ScreenConnectionChanged {
            id: session.id,
            connection: ScreenConnection::Connected,
        });
        info!("Created virtual screen {} on {}", session.id, surface);
        Ok(session.id)
    }

    /// Destroy a virtual screen; other kinds are left alone
    pub fn destroy_virtual_screen(&self, id: LogicalScreenId) -> bool {
        let _topology = self.multiscreen.lock_topology();
        match self.registry.get(id) {
            Some(session) if session.kind == ScreenKind::Virtual => {}
            Some(_) => {
                warn!("{} is not a virtual screen", id);
                return false;
            }
            None => {
                debug!("destroy_virtual_screen: unknown {}", id);
                return false;
            }
        }

        for group in self.grouping.remove_virtual_from_groups(&[id]) {
            self.notify_group(&group, vec![id], GroupChange::RemoveFromGroup);
        }
        self.registry.remove(id);
        self.registry.mapper().release(id);
        self.notifier.notify(ClientEvent::ScreenConnectionChanged {
            id,
            connection: ScreenConnection::Disconnected,
        });
        info!("Destroyed virtual screen {}", id);
        true
    }

    fn notify_group(&self, group: &ScreenSessionGroup, ids: Vec<LogicalScreenId>, change: GroupChange) {
        self.notifier.notify(ClientEvent::ScreenGroupChanged {
            group: group.id,
            ids,
            change,
        });
    }

    /// Add a client listener
    pub fn register_listener(&self, listener: Arc<dyn ClientListener>) {
        self.notifier.register(listener);
    }

    /// Wait until queued notifications are delivered
    pub fn flush_notifications(&self, timeout: Duration) -> Result<()> {
        self.notifier.flush(timeout)
    }

    /// Session registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Grouping engine
    pub fn grouping(&self) -> &Arc<GroupingEngine> {
        &self.grouping
    }

    /// Power controller
    pub fn power(&self) -> &PowerController {
        &self.power
    }

    /// Multi-screen coordinator
    pub fn multiscreen(&self) -> &MultiScreenCoordinator {
        &self.multiscreen
    }

    /// Stop the executors, waiting for queued work
    pub fn shutdown(mut self) {
        info!("Shutting down screen session manager");
        self.power.diagnostics().log_status();
        self.general.shutdown();
    }
}
