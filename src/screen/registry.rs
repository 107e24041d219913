//! Session Registry
//!
//! Owns every [`ScreenSession`], keyed by logical id. The same lock also
//! guards the group map so that membership and session state change together.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::group::{detach_locked, sweep_empty_groups_locked, CastInfo, GroupId, ScreenSessionGroup};
use super::{
    IdentityMapper, LogicalScreenId, PhysicalSurfaceId, ScreenKind, ScreenProperty, ScreenSession,
};
use crate::error::{Result, ScreenError};

/// Session and group arena
#[derive(Debug, Default)]
pub(crate) struct ScreenMap {
    pub(crate) sessions: HashMap<LogicalScreenId, ScreenSession>,
    pub(crate) twins: HashMap<PhysicalSurfaceId, ScreenSession>,
    pub(crate) groups: HashMap<GroupId, ScreenSessionGroup>,
    pub(crate) cast_info: HashMap<LogicalScreenId, CastInfo>,
    pub(crate) next_group: u64,
}

/// Registry of screen sessions
pub struct SessionRegistry {
    mapper: Arc<IdentityMapper>,
    map: RwLock<ScreenMap>,
}

impl SessionRegistry {
    /// Create an empty registry backed by an identity mapper
    pub fn new(mapper: Arc<IdentityMapper>) -> Self {
        Self {
            mapper,
            map: RwLock::new(ScreenMap {
                next_group: 1,
                ..ScreenMap::default()
            }),
        }
    }

    /// Identity mapper shared with this registry
    pub fn mapper(&self) -> &Arc<IdentityMapper> {
        &self.mapper
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, ScreenMap> {
        self.map.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ScreenMap> {
        self.map.write()
    }

    /// Create (or revive) the session for a physical surface
    ///
    /// The logical id comes from the identity mapper; a new one is allocated
    /// when the surface has none yet.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateConnect` if a REAL session for the surface is still
    /// in use.
    pub fn create(
        &self,
        physical: PhysicalSurfaceId,
        kind: ScreenKind,
        property: ScreenProperty,
    ) -> Result<ScreenSession> {
        let mut map = self.map.write();
        let logical = self
            .mapper
            .lookup_logical(physical)
            .unwrap_or_else(|| self.mapper.allocate(physical));

        if let Some(existing) = map.sessions.get_mut(&logical) {
            if existing.is_real_in_use() {
                warn!("Duplicate connect for {} ({})", physical, logical);
                return Err(ScreenError::DuplicateConnect(physical));
            }
            if existing.is_current_in_use {
                warn!(
                    "Replacing in-use {:?} session {} with {:?}",
                    existing.kind, logical, kind
                );
                let session = ScreenSession::new(logical, physical, kind, property);
                map.sessions.insert(logical, session.clone());
                return Ok(session);
            }

            info!("Reviving session {} for {}", logical, physical);
            existing.kind = kind;
            existing.physical_id = physical;
            existing.property = property;
            existing.is_current_in_use = true;
            return Ok(existing.clone());
        }

        let session = ScreenSession::new(logical, physical, kind, property);
        info!("Created {:?} session {} for {}", kind, logical, physical);
        map.sessions.insert(logical, session.clone());
        Ok(session)
    }

    /// Snapshot of a session
    pub fn get(&self, logical: LogicalScreenId) -> Option<ScreenSession> {
        self.map.read().sessions.get(&logical).cloned()
    }

    /// Snapshot of the session bound to a physical surface
    pub fn get_by_physical(&self, physical: PhysicalSurfaceId) -> Option<ScreenSession> {
        let logical = self.mapper.lookup_logical(physical)?;
        self.get(logical)
    }

    /// Remove and return a session
    ///
    /// A session that is still a group member is detached in the same
    /// critical section, so no group ever lists a removed session. Listeners
    /// are not notified and render resources are not released here; that is
    /// up to the caller.
    pub fn remove(&self, logical: LogicalScreenId) -> Option<ScreenSession> {
        let mut map = self.map.write();
        if let Some(group) = map.sessions.get(&logical)?.group_id {
            warn!("Removing {} while still a member of group {}", logical, group);
            detach_locked(&mut map, logical);
            sweep_empty_groups_locked(&mut map);
        }
        let session = map.sessions.remove(&logical)?;
        map.cast_info.remove(&logical);
        if let Some(twin) = session.physical_counterpart {
            map.twins.remove(&twin);
        }
        debug!("Removed session {}", logical);
        Some(session)
    }

    /// Mutate a session in place under the map lock
    pub fn update<R>(
        &self,
        logical: LogicalScreenId,
        f: impl FnOnce(&mut ScreenSession) -> R,
    ) -> Option<R> {
        let mut map = self.map.write();
        map.sessions.get_mut(&logical).map(f)
    }

    /// Exchange the panels bound to two sessions
    ///
    /// Surface, size, density and identity move with the panel; logical id,
    /// topology role, position and flags stay with the session. The identity
    /// mapper is rebound in the same critical section.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if either session is unknown
    pub fn swap_bindings(&self, a: LogicalScreenId, b: LogicalScreenId) -> Result<()> {
        let mut map = self.map.write();
        let first = map.sessions.get(&a).cloned().ok_or(ScreenError::NotFound(a))?;
        let second = map.sessions.get(&b).cloned().ok_or(ScreenError::NotFound(b))?;
        if a == b {
            return Ok(());
        }

        self.mapper.bind(second.physical_id, a);
        self.mapper.bind(first.physical_id, b);
        if let Some(session) = map.sessions.get_mut(&a) {
            take_panel(session, &second);
        }
        if let Some(session) = map.sessions.get_mut(&b) {
            take_panel(session, &first);
        }
        info!(
            "Swapped panels: {} -> {}, {} -> {}",
            a, second.physical_id, b, first.physical_id
        );
        Ok(())
    }

    /// Lazily create the geometry twin of a physical panel
    ///
    /// Returns `None` when no session is bound to the surface. Repeated calls
    /// return the memoized twin.
    pub fn get_or_create_physical_counterpart(
        &self,
        physical: PhysicalSurfaceId,
    ) -> Option<ScreenSession> {
        let mut map = self.map.write();
        if let Some(twin) = map.twins.get(&physical) {
            return Some(twin.clone());
        }

        let logical = self.mapper.lookup_logical(physical)?;
        let owner = map.sessions.get_mut(&logical)?;
        owner.physical_counterpart = Some(physical);

        let mut twin = owner.clone();
        twin.group_id = None;
        twin.physical_counterpart = None;
        twin.property.position = super::Point::ORIGIN;

        debug!("Created physical counterpart for {} ({})", physical, logical);
        map.twins.insert(physical, twin.clone());
        Some(twin)
    }

    /// Snapshot of all sessions, sorted by logical id
    pub fn sessions(&self) -> Vec<ScreenSession> {
        let map = self.map.read();
        let mut sessions: Vec<_> = map.sessions.values().cloned().collect();
        sessions.sort_by_key(|s| s.id);
        sessions
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.map.read().sessions.len()
    }

    /// Whether there are no sessions
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physical ids of connected REAL sessions, sorted
    pub fn real_in_use_physical_ids(&self) -> Vec<PhysicalSurfaceId> {
        let map = self.map.read();
        let mut ids: Vec<_> = map
            .sessions
            .values()
            .filter(|s| s.is_real_in_use())
            .map(|s| s.physical_id)
            .collect();
        ids.sort();
        ids
    }

    /// Default screen: the internal panel, else the first REAL session
    pub fn default_screen_id(&self) -> Option<LogicalScreenId> {
        default_screen_locked(&self.map.read())
    }
}

fn take_panel(target: &mut ScreenSession, from: &ScreenSession) {
    target.physical_id = from.physical_id;
    target.identity = from.identity.clone();
    target.property.width = from.property.width;
    target.property.height = from.property.height;
    target.property.density = from.property.density;
    target.physical_counterpart = from.physical_counterpart;
}

pub(crate) fn default_screen_locked(map: &ScreenMap) -> Option<LogicalScreenId> {
    let mut real: Vec<_> = map.sessions.values().filter(|s| s.is_real_in_use()).collect();
    real.sort_by_key(|s| s.id);
    real.iter()
        .find(|s| s.is_internal)
        .or_else(|| real.first())
        .map(|s| s.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(IdentityMapper::new()))
    }

    #[test]
    fn test_create_uses_mapped_id() {
        let registry = registry();
        let logical = registry.mapper().allocate(PhysicalSurfaceId(100));

        let session = registry
            .create(
                PhysicalSurfaceId(100),
                ScreenKind::Real,
                ScreenProperty::with_size(1920, 1080),
            )
            .unwrap();

        assert_eq!(session.id, logical);
        assert_eq!(registry.get(logical).unwrap().physical_id, PhysicalSurfaceId(100));
    }

    #[test]
    fn test_duplicate_connect() {
        let registry = registry();
        registry
            .create(PhysicalSurfaceId(5), ScreenKind::Real, ScreenProperty::default())
            .unwrap();

        let err = registry
            .create(PhysicalSurfaceId(5), ScreenKind::Real, ScreenProperty::default())
            .unwrap_err();
        assert!(matches!(err, ScreenError::DuplicateConnect(PhysicalSurfaceId(5))));
    }

    #[test]
    fn test_reconnect_revives_unused_session() {
        let registry = registry();
        let first = registry
            .create(PhysicalSurfaceId(5), ScreenKind::Real, ScreenProperty::with_size(800, 600))
            .unwrap();
        registry.update(first.id, |s| s.is_current_in_use = false);

        let revived = registry
            .create(PhysicalSurfaceId(5), ScreenKind::Real, ScreenProperty::with_size(1024, 768))
            .unwrap();
        assert_eq!(revived.id, first.id);
        assert!(revived.is_current_in_use);
        assert_eq!(revived.property.width, 1024);
    }

    #[test]
    fn test_virtual_session_does_not_block_connect() {
        let registry = registry();
        registry
            .create(PhysicalSurfaceId(9), ScreenKind::Virtual, ScreenProperty::default())
            .unwrap();
        let real = registry
            .create(PhysicalSurfaceId(9), ScreenKind::Real, ScreenProperty::default())
            .unwrap();
        assert_eq!(real.kind, ScreenKind::Real);
    }

    #[test]
    fn test_remove_returns_session_once() {
        let registry = registry();
        let session = registry
            .create(PhysicalSurfaceId(1), ScreenKind::Real, ScreenProperty::default())
            .unwrap();

        assert_eq!(registry.remove(session.id).map(|s| s.id), Some(session.id));
        assert!(registry.remove(session.id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_detaches_group_member() {
        let registry = Arc::new(registry());
        let grouping = crate::screen::GroupingEngine::new(Arc::clone(&registry), false);
        let main = registry
            .create(PhysicalSurfaceId(1), ScreenKind::Real, ScreenProperty::default())
            .unwrap();
        let other = registry
            .create(PhysicalSurfaceId(2), ScreenKind::Real, ScreenProperty::default())
            .unwrap();
        let group = grouping.add_to_group(main.id, false).unwrap().id;
        grouping.add_to_group(other.id, false).unwrap();

        registry.remove(main.id).unwrap();
        let remaining = grouping.group(group).unwrap();
        assert_eq!(remaining.member_ids(), vec![other.id]);
        assert_eq!(remaining.anchor, Some(other.id));

        registry.remove(other.id).unwrap();
        assert!(grouping.groups().is_empty());
    }

    #[test]
    fn test_physical_counterpart_is_memoized() {
        let registry = registry();
        let session = registry
            .create(PhysicalSurfaceId(3), ScreenKind::Real, ScreenProperty::with_size(2000, 1000))
            .unwrap();

        let twin = registry
            .get_or_create_physical_counterpart(PhysicalSurfaceId(3))
            .unwrap();
        registry.update(session.id, |s| s.property.width = 10);
        let again = registry
            .get_or_create_physical_counterpart(PhysicalSurfaceId(3))
            .unwrap();

        assert_eq!(twin, again);
        assert_eq!(again.property.width, 2000);
        assert_eq!(
            registry.get(session.id).unwrap().physical_counterpart,
            Some(PhysicalSurfaceId(3))
        );
        assert!(registry
            .get_or_create_physical_counterpart(PhysicalSurfaceId(404))
            .is_none());
    }

    #[test]
    fn test_default_screen_prefers_internal() {
        let registry = registry();
        let external = registry
            .create(PhysicalSurfaceId(1), ScreenKind::Real, ScreenProperty::default())
            .unwrap();
        assert_eq!(registry.default_screen_id(), Some(external.id));

        let internal = registry
            .create(PhysicalSurfaceId(2), ScreenKind::Real, ScreenProperty::default())
            .unwrap();
        registry.update(internal.id, |s| s.is_internal = true);
        assert_eq!(registry.default_screen_id(), Some(internal.id));
        assert_eq!(
            registry.real_in_use_physical_ids(),
            vec![PhysicalSurfaceId(1), PhysicalSurfaceId(2)]
        );
    }

    #[test]
    fn test_swap_bindings_rebinds_mapper() {
        let registry = registry();
        let a = registry
            .create(PhysicalSurfaceId(10), ScreenKind::Real, ScreenProperty::with_size(2480, 2200))
            .unwrap();
        let b = registry
            .create(PhysicalSurfaceId(20), ScreenKind::Real, ScreenProperty::with_size(1080, 2500))
            .unwrap();

        registry.swap_bindings(a.id, b.id).unwrap();

        let mapper = registry.mapper();
        assert_eq!(mapper.lookup_logical(PhysicalSurfaceId(20)), Some(a.id));
        assert_eq!(mapper.lookup_logical(PhysicalSurfaceId(10)), Some(b.id));
        let swapped = registry.get(a.id).unwrap();
        assert_eq!(swapped.physical_id, PhysicalSurfaceId(20));
        assert_eq!(swapped.property.width, 1080);
        assert!(matches!(
            registry.swap_bindings(a.id, LogicalScreenId(99)),
            Err(ScreenError::NotFound(LogicalScreenId(99)))
        ));
    }
}
