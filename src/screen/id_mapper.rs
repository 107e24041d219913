//! Identity Mapper
//!
//! Bidirectional translation between physical surface ids (driver/render
//! side) and logical screen ids (client side).

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{LogicalScreenId, PhysicalSurfaceId};

#[derive(Debug, Default)]
struct IdMaps {
    next_logical: u64,
    logical_to_physical: HashMap<LogicalScreenId, PhysicalSurfaceId>,
    physical_to_logical: HashMap<PhysicalSurfaceId, LogicalScreenId>,
    /// Logical ids allocated without a surface
    unbound: Vec<LogicalScreenId>,
}

impl IdMaps {
    fn next_id(&mut self) -> LogicalScreenId {
        let id = LogicalScreenId(self.next_logical);
        self.next_logical += 1;
        id
    }

    /// Drop whatever the logical id and the physical id currently point to
    fn unlink(&mut self, logical: LogicalScreenId, physical: PhysicalSurfaceId) {
        if let Some(old_physical) = self.logical_to_physical.remove(&logical) {
            if old_physical != physical
                && self.physical_to_logical.get(&old_physical) == Some(&logical)
            {
                debug!("Dropping stale reverse entry {} -> {}", old_physical, logical);
                self.physical_to_logical.remove(&old_physical);
            }
        }
        if let Some(old_logical) = self.physical_to_logical.remove(&physical) {
            if old_logical != logical
                && self.logical_to_physical.get(&old_logical) == Some(&physical)
            {
                debug!("Dropping stale forward entry {} -> {}", old_logical, physical);
                self.logical_to_physical.remove(&old_logical);
            }
        }
        self.unbound.retain(|id| *id != logical);
    }
}

/// Bidirectional id map guarded by one reader/writer lock
#[derive(Debug)]
pub struct IdentityMapper {
    maps: RwLock<IdMaps>,
}

impl Default for IdentityMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityMapper {
    /// Create an empty mapper; the first allocated logical id is 1
    pub fn new() -> Self {
        Self {
            maps: RwLock::new(IdMaps {
                next_logical: 1,
                ..IdMaps::default()
            }),
        }
    }

    /// Allocate a new logical id for a physical surface
    pub fn allocate(&self, physical: PhysicalSurfaceId) -> LogicalScreenId {
        let mut maps = self.maps.write();
        let logical = maps.next_id();
        if maps.physical_to_logical.contains_key(&physical) {
            warn!("{} was already mapped, rebinding to {}", physical, logical);
        }
        maps.unlink(logical, physical);
        maps.logical_to_physical.insert(logical, physical);
        maps.physical_to_logical.insert(physical, logical);
        info!("Allocated {} for {}", logical, physical);
        logical
    }

    /// Allocate a logical id that has no surface yet
    pub fn allocate_unbound(&self) -> LogicalScreenId {
        let mut maps = self.maps.write();
        let logical = maps.next_id();
        maps.unbound.push(logical);
        debug!("Allocated unbound {}", logical);
        logical
    }

    /// Force both directions to point at each other
    ///
    /// Used for role swaps. Previous entries of either id are removed, so a
    /// rebind never leaves a stale mapping behind.
    pub fn bind(&self, physical: PhysicalSurfaceId, logical: LogicalScreenId) {
        let mut maps = self.maps.write();
        maps.unlink(logical, physical);
        maps.logical_to_physical.insert(logical, physical);
        maps.physical_to_logical.insert(physical, logical);
        info!("Bound {} <-> {}", logical, physical);
    }

    /// Physical surface currently bound to a logical id
    pub fn lookup_physical(&self, logical: LogicalScreenId) -> Option<PhysicalSurfaceId> {
        self.maps.read().logical_to_physical.get(&logical).copied()
    }

    /// Logical id currently bound to a physical surface
    pub fn lookup_logical(&self, physical: PhysicalSurfaceId) -> Option<LogicalScreenId> {
        self.maps.read().physical_to_logical.get(&physical).copied()
    }

    /// Whether the logical id is known (bound or unbound)
    pub fn contains(&self, logical: LogicalScreenId) -> bool {
        let maps = self.maps.read();
        maps.logical_to_physical.contains_key(&logical) || maps.unbound.contains(&logical)
    }

    /// Remove both directions; unknown ids return `false`
    pub fn release(&self, logical: LogicalScreenId) -> bool {
        let mut maps = self.maps.write();
        if let Some(pos) = maps.unbound.iter().position(|id| *id == logical) {
            maps.unbound.remove(pos);
            return true;
        }
        let Some(physical) = maps.logical_to_physical.remove(&logical) else {
            debug!("Release of unknown {}", logical);
            return false;
        };
        if maps.physical_to_logical.get(&physical) == Some(&logical) {
            maps.physical_to_logical.remove(&physical);
        }
        info!("Released {} ({})", logical, physical);
        true
    }

    /// Current bound pairs, sorted by logical id
    pub fn snapshot(&self) -> Vec<(LogicalScreenId, PhysicalSurfaceId)> {
        let maps = self.maps.read();
        let mut pairs: Vec<_> = maps
            .logical_to_physical
            .iter()
            .map(|(l, p)| (*l, *p))
            .collect();
        pairs.sort();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_allocate_is_monotonic() {
        let mapper = IdentityMapper::new();
        let a = mapper.allocate(PhysicalSurfaceId(100));
        let b = mapper.allocate(PhysicalSurfaceId(200));
        assert_eq!(a, LogicalScreenId(1));
        assert_eq!(b, LogicalScreenId(2));
        assert_eq!(mapper.lookup_logical(PhysicalSurfaceId(200)), Some(b));
        assert_eq!(mapper.lookup_physical(a), Some(PhysicalSurfaceId(100)));
    }

    #[test]
    fn test_release_twice() {
        let mapper = IdentityMapper::new();
        let id = mapper.allocate(PhysicalSurfaceId(7));
        assert!(mapper.release(id));
        assert_eq!(mapper.lookup_physical(id), None);
        assert_eq!(mapper.lookup_logical(PhysicalSurfaceId(7)), None);
        assert!(!mapper.release(id));
    }

    #[test]
    fn test_bind_overwrites_reverse() {
        let mapper = IdentityMapper::new();
        let l1 = mapper.allocate(PhysicalSurfaceId(10));
        let l2 = mapper.allocate(PhysicalSurfaceId(20));

        mapper.bind(PhysicalSurfaceId(10), l1);
        mapper.bind(PhysicalSurfaceId(10), l2);

        assert_eq!(mapper.lookup_logical(PhysicalSurfaceId(10)), Some(l2));
        assert_eq!(mapper.lookup_physical(l2), Some(PhysicalSurfaceId(10)));
        // The old pairings of both ids are gone, not left dangling
        assert_eq!(mapper.lookup_physical(l1), None);
        assert_eq!(mapper.lookup_logical(PhysicalSurfaceId(20)), None);
    }

    #[test]
    fn test_role_swap() {
        let mapper = IdentityMapper::new();
        let inner = mapper.allocate(PhysicalSurfaceId(1));
        let outer = mapper.allocate(PhysicalSurfaceId(2));

        mapper.bind(PhysicalSurfaceId(2), inner);
        mapper.bind(PhysicalSurfaceId(1), outer);

        assert_eq!(mapper.lookup_physical(inner), Some(PhysicalSurfaceId(2)));
        assert_eq!(mapper.lookup_physical(outer), Some(PhysicalSurfaceId(1)));
        assert_eq!(mapper.lookup_logical(PhysicalSurfaceId(1)), Some(outer));
        assert_eq!(mapper.lookup_logical(PhysicalSurfaceId(2)), Some(inner));
    }

    #[test]
    fn test_unbound_ids() {
        let mapper = IdentityMapper::new();
        let id = mapper.allocate_unbound();
        assert!(mapper.contains(id));
        assert_eq!(mapper.lookup_physical(id), None);

        mapper.bind(PhysicalSurfaceId(9), id);
        assert_eq!(mapper.lookup_physical(id), Some(PhysicalSurfaceId(9)));
        assert!(mapper.release(id));
        assert!(!mapper.contains(id));
    }

    proptest! {
        #[test]
        fn prop_allocate_then_release(physicals in proptest::collection::vec(0u64..1000, 1..32)) {
            let mapper = IdentityMapper::new();
            let ids: Vec<_> = physicals
                .iter()
                .map(|p| mapper.allocate(PhysicalSurfaceId(*p)))
                .collect();
            for id in ids {
                mapper.release(id);
                prop_assert_eq!(mapper.lookup_physical(id), None);
                prop_assert!(!mapper.release(id));
            }
            prop_assert!(mapper.snapshot().is_empty());
        }
    }
}
