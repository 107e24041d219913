//! Multi-Screen Mode Coordinator
//!
//! Every topology change runs under one global lock for its whole duration.
//! Position math reads the session map as a stable snapshot, so two changes
//! never overlap, even on unrelated screen pairs. Hotplug takes the same lock
//! (see [`MultiScreenCoordinator::lock_topology`]), so a panel cannot appear
//! or vanish halfway through a change.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::persistence::{SettingsStore, TopologyRecord};
use super::position::{default_extend_layout, validated_or_default, PairPositions};
use super::MultiScreenMode;
use crate::error::{Result, ScreenError};
use crate::executor::ExecutorHandle;
use crate::notify::{ClientEvent, GroupChange, NotificationHub};
use crate::render::{RenderService, ScreenPlacement};
use crate::screen::{
    Combination, GroupId, GroupingEngine, LogicalScreenId, PhysicalSurfaceId, Point,
    ReconcileOutcome, ScreenKind, ScreenSession, ScreenSessionGroup,
};

/// Serialized multi-screen topology changes
pub struct MultiScreenCoordinator {
    grouping: Arc<GroupingEngine>,
    render: Arc<dyn RenderService>,
    general: ExecutorHandle<()>,
    notifier: Arc<NotificationHub>,
    settings: Arc<dyn SettingsStore>,
    call_timeout: Duration,
    topology_lock: Mutex<()>,
}

impl MultiScreenCoordinator {
    /// Create a coordinator
    ///
    /// # Arguments
    ///
    /// * `grouping` - Grouping engine (and through it the session registry)
    /// * `render` - Render service, called on the general executor
    /// * `general` - General executor
    /// * `notifier` - Client notification channel
    /// * `settings` - Topology store
    /// * `call_timeout` - Bound on each render call
    pub fn new(
        grouping: Arc<GroupingEngine>,
        render: Arc<dyn RenderService>,
        general: ExecutorHandle<()>,
        notifier: Arc<NotificationHub>,
        settings: Arc<dyn SettingsStore>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            grouping,
            render,
            general,
            notifier,
            settings,
            call_timeout,
            topology_lock: Mutex::new(()),
        }
    }

    /// Hold the topology lock while changing group membership outside the
    /// coordinator
    ///
    /// Not reentrant: the `*_locked` methods expect the guard to be held, the
    /// others take it themselves.
    pub(crate) fn lock_topology(&self) -> MutexGuard<'_, ()> {
        self.topology_lock.lock()
    }

    /// Switch a screen pair to mirror or extend
    ///
    /// Returns the positions that were applied. A failed render position
    /// call falls back to the default layout instead of failing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if both sides name the same surface and
    /// `PhysicalNotFound` if either surface has no session
    pub fn set_multi_screen_mode(
        &self,
        main: PhysicalSurfaceId,
        secondary: PhysicalSurfaceId,
        mode: MultiScreenMode,
    ) -> Result<PairPositions> {
        let _topology = self.topology_lock.lock();
        self.change_mode_locked(main, secondary, mode, None)
    }

    /// Place an extended screen pair
    ///
    /// Positions that do not share an edge are replaced by the default
    /// layout. Returns the positions that were applied.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if both sides name the same surface and
    /// `PhysicalNotFound` if either surface has no session
    pub fn set_relative_position(
        &self,
        main: PhysicalSurfaceId,
        secondary: PhysicalSurfaceId,
        positions: PairPositions,
    ) -> Result<PairPositions> {
        let _topology = self.topology_lock.lock();
        self.change_mode_locked(main, secondary, MultiScreenMode::Extend, Some(positions))
    }

    /// Move the internal role to another session
    ///
    /// The internal flag is cleared on `internal` first, the two panels are
    /// swapped in the identity mapper and registry, and the flag is set on
    /// `external`, which now shows the built-in panel.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if either session is unknown
    pub fn swap_internal_role(
        &self,
        internal: LogicalScreenId,
        external: LogicalScreenId,
    ) -> Result<()> {
        let _topology = self.topology_lock.lock();
        let registry = self.grouping.registry();

        let current = registry.get(internal).ok_or(ScreenError::NotFound(internal))?;
        if registry.get(external).is_none() {
            return Err(ScreenError::NotFound(external));
        }
        if !current.is_internal {
            warn!("{} is not the internal screen, swapping anyway", internal);
        }

        registry.update(internal, |s| s.is_internal = false);
        registry.swap_bindings(internal, external)?;
        registry.update(external, |s| s.is_internal = true);

        info!("Internal role moved from {} to {}", internal, external);
        Ok(())
    }

    /// Re-apply the persisted topology of a newly connected panel
    ///
    /// Only applied when the stored main panel is currently connected.
    /// Returns the restored mode.
    ///
    /// # Errors
    ///
    /// Returns `PhysicalNotFound` if the surface has no session, or a
    /// settings error from the store
    pub fn restore_topology(&self, secondary: PhysicalSurfaceId) -> Result<Option<MultiScreenMode>> {
        let _topology = self.topology_lock.lock();
        self.restore_topology_locked(secondary)
    }

    pub(crate) fn restore_topology_locked(
        &self,
        secondary: PhysicalSurfaceId,
    ) -> Result<Option<MultiScreenMode>> {
        let registry = self.grouping.registry();

        let session = registry
            .get_by_physical(secondary)
            .ok_or(ScreenError::PhysicalNotFound(secondary))?;
        let hash = session.identity.serial_hash();
        let Some(record) = self.settings.get(&hash)? else {
            debug!("No stored topology for {}", secondary);
            return Ok(None);
        };

        let main = registry.sessions().into_iter().find(|s| {
            s.is_real_in_use()
                && s.physical_id != secondary
                && s.identity.serial_hash() == record.main_serial_hash
        });
        let Some(main) = main else {
            info!(
                "Stored topology of {} names a panel that is not connected, skipping",
                secondary
            );
            return Ok(None);
        };

        info!("Restoring {} with {} as {}", secondary, main.physical_id, record.mode);
        let requested = match record.mode {
            MultiScreenMode::Extend => Some(record.positions),
            MultiScreenMode::Mirror => None,
        };
        self.change_mode_locked(main.physical_id, secondary, record.mode, requested)?;
        Ok(Some(record.mode))
    }

    /// A member left an extended group; a lone remaining screen goes back
    /// to a mirror group of one at the origin
    pub fn revert_after_disconnect(&self, group: &ScreenSessionGroup) -> bool {
        let _topology = self.topology_lock.lock();
        self.revert_after_disconnect_locked(group)
    }

    pub(crate) fn revert_after_disconnect_locked(&self, group: &ScreenSessionGroup) -> bool {
        if group.is_empty() || group.combination != Combination::Extend || group.len() != 1 {
            return false;
        }
        let Some(remaining) = group.anchor else {
            return false;
        };

        self.grouping
            .set_group_combination(group.id, Combination::Mirror);
        let outcome = self.grouping.reconcile_membership(
            group.id,
            &[remaining],
            &[Point::ORIGIN],
            Combination::Main,
            false,
        );
        info!("External screen gone, {} back to mirror in {}", remaining, group.id);

        self.notify_outcome(group.id, &outcome);
        self.notifier.notify(ClientEvent::ScreenModeChanged {
            id: remaining,
            combination: Combination::Main,
        });
        true
    }

    fn change_mode_locked(
        &self,
        main: PhysicalSurfaceId,
        secondary: PhysicalSurfaceId,
        mode: MultiScreenMode,
        requested: Option<PairPositions>,
    ) -> Result<PairPositions> {
        if main == secondary {
            warn!("Refusing to pair {} with itself", main);
            return Err(ScreenError::InvalidArgument(format!(
                "{} cannot be both main and secondary",
                main
            )));
        }
        let registry = self.grouping.registry();
        let main_session = registry
            .get_by_physical(main)
            .ok_or(ScreenError::PhysicalNotFound(main))?;
        let secondary_session = registry
            .get_by_physical(secondary)
            .ok_or(ScreenError::PhysicalNotFound(secondary))?;
        let was_mirror = secondary_session.combination == Combination::Mirror;

        let group = self.group_for(&main_session)?;
        let positions = match mode {
            MultiScreenMode::Mirror => PairPositions::MIRRORED,
            MultiScreenMode::Extend => validated_or_default(
                &main_session.property,
                &secondary_session.property,
                requested,
            ),
        };
        let positions = self.apply_positions(main, secondary, mode, positions, &main_session);

        let outcome = self.grouping.reconcile_pair(
            group,
            (main_session.id, positions.main),
            (secondary_session.id, positions.secondary),
            mode.combination(),
            true,
        );

        info!(
            "Multi-screen mode {} for {} + {} (secondary at {}, {})",
            mode, main_session.id, secondary_session.id, positions.secondary.x, positions.secondary.y
        );

        self.notify_outcome(group, &outcome);
        self.notifier.notify(ClientEvent::ScreenModeChanged {
            id: main_session.id,
            combination: Combination::Main,
        });
        self.notifier.notify(ClientEvent::ScreenModeChanged {
            id: secondary_session.id,
            combination: mode.combination(),
        });
        self.notifier.notify(ClientEvent::DisplayModeChanged {
            main: main_session.id,
            secondary: secondary_session.id,
            mode,
        });
        match mode {
            MultiScreenMode::Mirror => self
                .notifier
                .notify(ClientEvent::CaptureStatusChanged { capturing: true }),
            MultiScreenMode::Extend if was_mirror => self
                .notifier
                .notify(ClientEvent::CaptureStatusChanged { capturing: false }),
            MultiScreenMode::Extend => {}
        }

        self.persist(&main_session, &secondary_session, mode, positions);
        Ok(positions)
    }

    fn group_for(&self, main: &ScreenSession) -> Result<GroupId> {
        if let Some(group) = self.grouping.group_of(main.id) {
            return Ok(group.id);
        }
        self.grouping
            .add_to_group(main.id, false)
            .map(|group| group.id)
            .ok_or(ScreenError::NotFound(main.id))
    }

    /// Push positions to the render service, falling back to the default
    /// extended layout when the call fails
    fn apply_positions(
        &self,
        main: PhysicalSurfaceId,
        secondary: PhysicalSurfaceId,
        mode: MultiScreenMode,
        positions: PairPositions,
        main_session: &ScreenSession,
    ) -> PairPositions {
        let Err(e) = self.push_positions(main, secondary, positions) else {
            return positions;
        };
        if mode == MultiScreenMode::Mirror {
            warn!("Failed to reset positions for mirror: {}", e);
            return positions;
        }

        let fallback = default_extend_layout(&main_session.property);
        warn!(
            "Relative position call failed ({}), using default layout at ({}, {})",
            e, fallback.secondary.x, fallback.secondary.y
        );
        if fallback != positions {
            if let Err(e) = self.push_positions(main, secondary, fallback) {
                warn!("Default layout also rejected: {}", e);
            }
        }
        fallback
    }

    fn push_positions(
        &self,
        main: PhysicalSurfaceId,
        secondary: PhysicalSurfaceId,
        positions: PairPositions,
    ) -> Result<()> {
        let main = ScreenPlacement {
            physical: main,
            position: positions.main,
        };
        let secondary = ScreenPlacement {
            physical: secondary,
            position: positions.secondary,
        };

        let result = if self.general.is_current() {
            self.render.set_relative_position(main, secondary)
        } else {
            let render = Arc::clone(&self.render);
            self.general
                .submit(move |_| render.set_relative_position(main, secondary))
                .wait_timeout(self.call_timeout)?
        };
        result.map_err(ScreenError::from)
    }

    fn persist(
        &self,
        main: &ScreenSession,
        secondary: &ScreenSession,
        mode: MultiScreenMode,
        positions: PairPositions,
    ) {
        if secondary.kind != ScreenKind::Real {
            return;
        }
        let record = TopologyRecord {
            main_serial_hash: main.identity.serial_hash(),
            mode,
            positions,
        };
        if let Err(e) = self.settings.set(&secondary.identity.serial_hash(), record) {
            warn!("Failed to persist topology of {}: {}", secondary.id, e);
        }
    }

    fn notify_outcome(&self, group: GroupId, outcome: &ReconcileOutcome) {
        let classes = [
            (&outcome.added, GroupChange::AddToGroup),
            (&outcome.removed, GroupChange::RemoveFromGroup),
            (&outcome.changed, GroupChange::ChangeGroup),
        ];
        for (ids, change) in classes {
            if !ids.is_empty() {
                self.notifier.notify(ClientEvent::ScreenGroupChanged {
                    group,
                    ids: ids.clone(),
                    change,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::SerialExecutor;
    use crate::multiscreen::MemorySettingsStore;
    use crate::notify::EventRecorder;
    use crate::render::{MockRenderService, RenderError, SimulatedRenderService};
    use crate::screen::{IdentityMapper, PanelIdentity, ScreenProperty, SessionRegistry};

    struct Fixture {
        coordinator: MultiScreenCoordinator,
        grouping: Arc<GroupingEngine>,
        events: Arc<EventRecorder>,
        notifier: Arc<NotificationHub>,
        settings: Arc<MemorySettingsStore>,
        _general: SerialExecutor<()>,
    }

    fn fixture(render: Arc<dyn RenderService>) -> Fixture {
        let registry = Arc::new(SessionRegistry::new(Arc::new(IdentityMapper::new())));
        let grouping = Arc::new(GroupingEngine::new(Arc::clone(&registry), false));
        let general = SerialExecutor::new("test-general", ()).unwrap();
        let notifier = Arc::new(NotificationHub::new(general.handle()));
        let events = Arc::new(EventRecorder::new());
        notifier.register(events.clone());
        let settings = Arc::new(MemorySettingsStore::new());
        let coordinator = MultiScreenCoordinator::new(
            Arc::clone(&grouping),
            render,
            general.handle(),
            Arc::clone(&notifier),
            settings.clone(),
            Duration::from_secs(2),
        );
        Fixture {
            coordinator,
            grouping,
            events,
            notifier,
            settings,
            _general: general,
        }
    }

    fn connect(fixture: &Fixture, physical: u64, width: u32, serial: &str) -> ScreenSession {
        let registry = fixture.grouping.registry();
        let session = registry
            .create(
                PhysicalSurfaceId(physical),
                ScreenKind::Real,
                ScreenProperty::with_size(width, 1080),
            )
            .unwrap();
        registry.update(session.id, |s| {
            s.identity = PanelIdentity {
                name: format!("panel-{}", physical),
                serial_number: serial.to_string(),
                ..PanelIdentity::default()
            };
        });
        fixture.grouping.add_to_group(session.id, false);
        registry.get(session.id).unwrap()
    }

    #[test]
    fn test_extend_places_secondary_past_main() {
        let fixture = fixture(Arc::new(SimulatedRenderService::new()));
        let main = connect(&fixture, 1, 2560, "A");
        let secondary = connect(&fixture, 2, 1920, "B");

        let positions = fixture
            .coordinator
            .set_multi_screen_mode(main.physical_id, secondary.physical_id, MultiScreenMode::Extend)
            .unwrap();

        assert_eq!(positions.secondary, Point::new(2560, 0));
        let registry = fixture.grouping.registry();
        let secondary = registry.get(secondary.id).unwrap();
        assert_eq!(secondary.combination, Combination::Extend);
        assert!(secondary.is_extend);
        assert_eq!(secondary.property.position, Point::new(2560, 0));
        assert_eq!(registry.get(main.id).unwrap().combination, Combination::Main);
        assert_eq!(
            fixture.grouping.group_of(main.id).unwrap().combination,
            Combination::Extend
        );
    }

    #[test]
    fn test_render_failure_falls_back_to_default_layout() {
        let render = Arc::new(SimulatedRenderService::new());
        render.set_fail_relative_position(true);
        let fixture = fixture(render);
        let main = connect(&fixture, 1, 1920, "A");
        let secondary = connect(&fixture, 2, 1280, "B");

        let below = PairPositions {
            main: Point::ORIGIN,
            secondary: Point::new(0, 1080),
        };
        let applied = fixture
            .coordinator
            .set_relative_position(main.physical_id, secondary.physical_id, below)
            .unwrap();

        assert_eq!(applied.secondary, Point::new(1920, 0));
        let stored = fixture.grouping.registry().get(secondary.id).unwrap();
        assert_eq!(stored.property.position, Point::new(1920, 0));
    }

    #[test]
    fn test_mirror_resets_origin_and_marks_capture() {
        let fixture = fixture(Arc::new(SimulatedRenderService::new()));
        let main = connect(&fixture, 1, 1920, "A");
        let secondary = connect(&fixture, 2, 1920, "B");
        fixture
            .coordinator
            .set_multi_screen_mode(main.physical_id, secondary.physical_id, MultiScreenMode::Extend)
            .unwrap();

        let positions = fixture
            .coordinator
            .set_multi_screen_mode(main.physical_id, secondary.physical_id, MultiScreenMode::Mirror)
            .unwrap();
        fixture.notifier.flush(Duration::from_secs(1)).unwrap();

        assert_eq!(positions, PairPositions::MIRRORED);
        let stored = fixture.grouping.registry().get(secondary.id).unwrap();
        assert_eq!(stored.property.position, Point::ORIGIN);
        assert_eq!(stored.combination, Combination::Mirror);
        assert!(fixture
            .events
            .events()
            .contains(&ClientEvent::CaptureStatusChanged { capturing: true }));
        assert!(fixture.events.events().contains(&ClientEvent::DisplayModeChanged {
            main: main.id,
            secondary: stored.id,
            mode: MultiScreenMode::Mirror,
        }));
    }

    #[test]
    fn test_unknown_surface() {
        let fixture = fixture(Arc::new(SimulatedRenderService::new()));
        let main = connect(&fixture, 1, 1920, "A");

        let err = fixture
            .coordinator
            .set_multi_screen_mode(main.physical_id, PhysicalSurfaceId(77), MultiScreenMode::Extend)
            .unwrap_err();
        assert!(matches!(err, ScreenError::PhysicalNotFound(PhysicalSurfaceId(77))));
    }

    #[test]
    fn test_mode_change_moves_anchor_to_main() {
        let fixture = fixture(Arc::new(SimulatedRenderService::new()));
        let external = connect(&fixture, 2, 1920, "B");
        let internal = connect(&fixture, 1, 2560, "A");
        assert_eq!(
            fixture.grouping.group_of(internal.id).unwrap().anchor,
            Some(external.id)
        );

        fixture
            .coordinator
            .set_multi_screen_mode(internal.physical_id, external.physical_id, MultiScreenMode::Mirror)
            .unwrap();

        let group = fixture.grouping.group_of(internal.id).unwrap();
        assert_eq!(group.anchor, Some(internal.id));
        assert_eq!(group.member_ids(), vec![internal.id, external.id]);
        let registry = fixture.grouping.registry();
        assert_eq!(registry.get(internal.id).unwrap().combination, Combination::Main);
        assert_eq!(registry.get(external.id).unwrap().combination, Combination::Mirror);
    }

    #[test]
    fn test_same_surface_on_both_sides_is_rejected() {
        let mut render = MockRenderService::new();
        render.expect_set_relative_position().times(0);
        let fixture = fixture(Arc::new(render));
        let main = connect(&fixture, 1, 1920, "A");

        for mode in [MultiScreenMode::Mirror, MultiScreenMode::Extend] {
            let err = fixture
                .coordinator
                .set_multi_screen_mode(main.physical_id, main.physical_id, mode)
                .unwrap_err();
            assert!(matches!(err, ScreenError::InvalidArgument(_)));
        }
        let err = fixture
            .coordinator
            .set_relative_position(main.physical_id, main.physical_id, PairPositions::MIRRORED)
            .unwrap_err();
        assert!(matches!(err, ScreenError::InvalidArgument(_)));

        let session = fixture.grouping.registry().get(main.id).unwrap();
        assert_eq!(session.combination, Combination::Main);
        assert!(fixture.settings.get(&main.identity.serial_hash()).unwrap().is_none());
    }

    #[test]
    fn test_restore_requires_matching_main_panel() {
        let fixture = fixture(Arc::new(SimulatedRenderService::new()));
        let main = connect(&fixture, 1, 1920, "A");
        let secondary = connect(&fixture, 2, 1280, "B");
        fixture
            .coordinator
            .set_multi_screen_mode(main.physical_id, secondary.physical_id, MultiScreenMode::Extend)
            .unwrap();
        let key = secondary.identity.serial_hash();
        assert!(fixture.settings.get(&key).unwrap().is_some());

        fixture
            .coordinator
            .set_multi_screen_mode(main.physical_id, secondary.physical_id, MultiScreenMode::Mirror)
            .unwrap();
        let mut record = fixture.settings.get(&key).unwrap().unwrap();
        record.mode = MultiScreenMode::Extend;
        record.positions = PairPositions {
            main: Point::ORIGIN,
            secondary: Point::new(1920, 0),
        };
        fixture.settings.set(&key, record.clone()).unwrap();

        let restored = fixture.coordinator.restore_topology(secondary.physical_id).unwrap();
        assert_eq!(restored, Some(MultiScreenMode::Extend));
        assert_eq!(
            fixture.grouping.registry().get(secondary.id).unwrap().combination,
            Combination::Extend
        );

        record.main_serial_hash = "not-connected".to_string();
        fixture.settings.set(&key, record).unwrap();
        assert_eq!(fixture.coordinator.restore_topology(secondary.physical_id).unwrap(), None);
    }

    #[test]
    fn test_swap_internal_role() {
        let fixture = fixture(Arc::new(SimulatedRenderService::new()));
        let internal = connect(&fixture, 1, 2480, "inner");
        let external = connect(&fixture, 2, 1080, "outer");
        let registry = fixture.grouping.registry();
        registry.update(internal.id, |s| s.is_internal = true);

        fixture
            .coordinator
            .swap_internal_role(internal.id, external.id)
            .unwrap();

        let now_external = registry.get(internal.id).unwrap();
        let now_internal = registry.get(external.id).unwrap();
        assert!(!now_external.is_internal);
        assert!(now_internal.is_internal);
        assert_eq!(now_internal.physical_id, PhysicalSurfaceId(1));
        assert_eq!(
            registry.mapper().lookup_logical(PhysicalSurfaceId(1)),
            Some(external.id)
        );
        assert!(fixture
            .coordinator
            .swap_internal_role(internal.id, LogicalScreenId(404))
            .is_err());
    }

    #[test]
    fn test_revert_after_extended_disconnect() {
        let fixture = fixture(Arc::new(SimulatedRenderService::new()));
        let main = connect(&fixture, 1, 1920, "A");
        let secondary = connect(&fixture, 2, 1920, "B");
        fixture
            .coordinator
            .set_multi_screen_mode(main.physical_id, secondary.physical_id, MultiScreenMode::Extend)
            .unwrap();

        let remaining = fixture.grouping.remove_from_group(secondary.id).unwrap();
        assert!(fixture.coordinator.revert_after_disconnect(&remaining));

        let group = fixture.grouping.group_of(main.id).unwrap();
        assert_eq!(group.combination, Combination::Mirror);
        assert_eq!(group.member_ids(), vec![main.id]);
        let main = fixture.grouping.registry().get(main.id).unwrap();
        assert_eq!(main.combination, Combination::Main);
        assert!(!main.is_extend);
    }

    #[test]
    fn test_position_call_goes_through_render_service() {
        let mut render = MockRenderService::new();
        render
            .expect_set_relative_position()
            .times(1)
            .withf(|main, secondary| {
                main.physical == PhysicalSurfaceId(1)
                    && secondary.physical == PhysicalSurfaceId(2)
                    && secondary.position == Point::new(1920, 0)
            })
            .returning(|_, _| Ok(()));
        let fixture = fixture(Arc::new(render));
        let main = connect(&fixture, 1, 1920, "A");
        let secondary = connect(&fixture, 2, 1920, "B");

        fixture
            .coordinator
            .set_multi_screen_mode(main.physical_id, secondary.physical_id, MultiScreenMode::Extend)
            .unwrap();
    }

    #[test]
    fn test_failed_fallback_still_applies_default() {
        let mut render = MockRenderService::new();
        render
            .expect_set_relative_position()
            .times(2)
            .returning(|_, _| Err(RenderError::CallFailed("no layout".to_string())));
        let fixture = fixture(Arc::new(render));
        let main = connect(&fixture, 1, 1600, "A");
        let secondary = connect(&fixture, 2, 1920, "B");

        let applied = fixture
            .coordinator
            .set_relative_position(
                main.physical_id,
                secondary.physical_id,
                PairPositions {
                    main: Point::ORIGIN,
                    secondary: Point::new(0, 1080),
                },
            )
            .unwrap();
        assert_eq!(applied, default_extend_layout(&main.property));
    }
}
