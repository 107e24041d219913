//! Grouping Engine
//!
//! Maintains mirror/extend/unique groups over the sessions of a
//! [`SessionRegistry`]. Groups live in the registry's screen map and every
//! operation here runs under a single acquisition of its write lock, so a
//! reader sees either the old or the new membership.
//!
//! # Invariants
//!
//! - A group that can be observed has at least one member.
//! - A session's `group_id` names a group that lists it as a member.
//! - A group has exactly one combination kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::registry::{default_screen_locked, ScreenMap};
use super::{Combination, LogicalScreenId, Point, SessionRegistry};

/// Group identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.0)
    }
}

/// One member of a group and its start offset in the combined desktop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupMember {
    /// Member session
    pub id: LogicalScreenId,
    /// Start offset relative to the anchor
    pub start: Point,
}

/// Snapshot of a screen group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSessionGroup {
    /// Group id
    pub id: GroupId,
    /// Combination shared by the group
    pub combination: Combination,
    /// Mirror source / first screen
    pub anchor: Option<LogicalScreenId>,
    /// Members in insertion order
    pub members: Vec<GroupMember>,
}

impl ScreenSessionGroup {
    fn new(id: GroupId, combination: Combination, anchor: LogicalScreenId) -> Self {
        Self {
            id,
            combination,
            anchor: Some(anchor),
            members: Vec::new(),
        }
    }

    /// Whether the session is a member
    pub fn contains(&self, id: LogicalScreenId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    /// Member ids in order
    pub fn member_ids(&self) -> Vec<LogicalScreenId> {
        self.members.iter().map(|m| m.id).collect()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members (only visible on a removal snapshot)
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Last topology a session was reconciled into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CastInfo {
    pub(crate) target: LogicalScreenId,
    pub(crate) combination: Combination,
}

/// Classification of the sessions processed by a reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Joined the group without a previous group
    pub added: Vec<LogicalScreenId>,
    /// Left another group to join this one
    pub removed: Vec<LogicalScreenId>,
    /// Already in the group, combination or offset updated
    pub changed: Vec<LogicalScreenId>,
}

impl ReconcileOutcome {
    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Group membership operations over a session registry
pub struct GroupingEngine {
    registry: Arc<SessionRegistry>,
    expand_by_default: bool,
}

impl GroupingEngine {
    /// Create a grouping engine
    ///
    /// # Arguments
    ///
    /// * `registry` - Session registry holding sessions and groups
    /// * `expand_by_default` - First group is EXTEND instead of MIRROR
    pub fn new(registry: Arc<SessionRegistry>, expand_by_default: bool) -> Self {
        Self {
            registry,
            expand_by_default,
        }
    }

    /// Session registry this engine operates on
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Put a session into a group
    ///
    /// The first group is created with the session as anchor. Later sessions
    /// join the default screen's group right after the anchor. `unique`
    /// always creates a separate UNIQUE group.
    ///
    /// Returns `None` for unknown sessions.
    pub fn add_to_group(&self, id: LogicalScreenId, unique: bool) -> Option<ScreenSessionGroup> {
        let mut map = self.registry.write();
        let Some(session) = map.sessions.get(&id) else {
            warn!("add_to_group: unknown session {}", id);
            return None;
        };
        if let Some(existing) = session.group_id {
            debug!("{} is already in group {}", id, existing);
            return map.groups.get(&existing).cloned();
        }

        if unique || map.groups.is_empty() {
            let combination = if unique {
                Combination::Unique
            } else if self.expand_by_default {
                Combination::Extend
            } else {
                Combination::Mirror
            };
            let group_id = create_group_locked(&mut map, combination, id);
            attach_locked(&mut map, group_id, id, Point::ORIGIN, anchor_role(combination));
            info!("Created group {} ({}) anchored at {}", group_id, combination, id);
            return map.groups.get(&group_id).cloned();
        }

        let target = default_screen_locked(&map)
            .and_then(|default| map.sessions.get(&default))
            .and_then(|s| s.group_id)
            .or_else(|| map.groups.keys().min().copied());
        let Some(group_id) = target else {
            warn!("add_to_group: no target group for {}", id);
            return None;
        };

        let combination = map.groups.get(&group_id)?.combination;
        let start = successor_start(&map, group_id, combination);
        attach_locked(&mut map, group_id, id, start, combination);
        info!("{} joined group {} at ({}, {})", id, group_id, start.x, start.y);
        map.groups.get(&group_id).cloned()
    }

    /// Reconcile a set of sessions into `group` with one combination
    ///
    /// With `filter_unchanged`, a session already in the group with the same
    /// combination and the same offset (or the same recorded cast target) is
    /// left untouched. Everything happens under one lock acquisition; groups
    /// emptied along the way are deleted at the end.
    pub fn reconcile_membership(
        &self,
        group: GroupId,
        ids: &[LogicalScreenId],
        starts: &[Point],
        combination: Combination,
        filter_unchanged: bool,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        let mut map = self.registry.write();

        let Some(target) = map.groups.get_mut(&group) else {
            warn!("reconcile_membership: unknown group {}", group);
            return outcome;
        };
        set_shared_combination(target, combination);

        for (index, id) in ids.iter().copied().enumerate() {
            let start = starts.get(index).copied().unwrap_or(Point::ORIGIN);
            reconcile_member_locked(
                &mut map,
                group,
                id,
                start,
                combination,
                filter_unchanged,
                &mut outcome,
            );
        }

        sweep_empty_groups_locked(&mut map);
        log_outcome(group, combination, &outcome);
        outcome
    }

    /// Reconcile a main screen and its partner into `group` in one step
    ///
    /// `main` becomes the group's anchor (the mirror source) with the MAIN
    /// role, `secondary` takes `combination`, and the group takes it as its
    /// shared combination. Nothing changes unless the group and both
    /// sessions exist and the two sessions differ.
    pub fn reconcile_pair(
        &self,
        group: GroupId,
        main: (LogicalScreenId, Point),
        secondary: (LogicalScreenId, Point),
        combination: Combination,
        filter_unchanged: bool,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        let (main_id, main_start) = main;
        let (secondary_id, secondary_start) = secondary;
        if main_id == secondary_id {
            warn!("reconcile_pair: {} cannot pair with itself", main_id);
            return outcome;
        }

        let mut map = self.registry.write();
        for id in [main_id, secondary_id] {
            if !map.sessions.contains_key(&id) {
                warn!("reconcile_pair: session {} is gone", id);
                return outcome;
            }
        }
        if !map.groups.contains_key(&group) {
            warn!("reconcile_pair: unknown group {}", group);
            return outcome;
        }

        if let Some(target) = map.groups.get_mut(&group) {
            set_shared_combination(target, combination);
            if target.anchor != Some(main_id) {
                debug!("Group {} anchor {:?} -> {}", group, target.anchor, main_id);
                target.anchor = Some(main_id);
            }
        }
        reconcile_member_locked(
            &mut map,
            group,
            main_id,
            main_start,
            Combination::Main,
            filter_unchanged,
            &mut outcome,
        );
        if let Some(target) = map.groups.get_mut(&group) {
            if let Some(index) = target.members.iter().position(|m| m.id == main_id) {
                let member = target.members.remove(index);
                target.members.insert(0, member);
            }
        }
        reconcile_member_locked(
            &mut map,
            group,
            secondary_id,
            secondary_start,
            combination,
            filter_unchanged,
            &mut outcome,
        );

        sweep_empty_groups_locked(&mut map);
        log_outcome(group, combination, &outcome);
        outcome
    }

    /// Take a session out of its group
    ///
    /// Returns the group as it is after the removal. An empty snapshot means
    /// the group was deleted together with its last member. Unknown sessions
    /// and sessions without a group return `None`.
    pub fn remove_from_group(&self, id: LogicalScreenId) -> Option<ScreenSessionGroup> {
        let mut map = self.registry.write();
        if !map.sessions.contains_key(&id) {
            debug!("remove_from_group: unknown session {}", id);
            return None;
        }
        let snapshot = detach_locked(&mut map, id);
        sweep_empty_groups_locked(&mut map);
        snapshot
    }

    /// Remove VIRTUAL sessions from their groups; other kinds are ignored
    ///
    /// Returns one snapshot per affected group.
    pub fn remove_virtual_from_groups(&self, ids: &[LogicalScreenId]) -> Vec<ScreenSessionGroup> {
        let mut map = self.registry.write();
        let mut affected: Vec<ScreenSessionGroup> = Vec::new();
        for id in ids {
            let is_virtual = map
                .sessions
                .get(id)
                .is_some_and(|s| s.kind == super::ScreenKind::Virtual);
            if !is_virtual {
                debug!("remove_virtual_from_groups: skipping {}", id);
                continue;
            }
            if let Some(snapshot) = detach_locked(&mut map, *id) {
                match affected.iter_mut().find(|g| g.id == snapshot.id) {
                    Some(existing) => *existing = snapshot,
                    None => affected.push(snapshot),
                }
            }
        }
        sweep_empty_groups_locked(&mut map);
        affected
    }

    /// Change the combination shared by a group, members keep their roles
    pub fn set_group_combination(&self, id: GroupId, combination: Combination) -> bool {
        let mut map = self.registry.write();
        match map.groups.get_mut(&id) {
            Some(group) => {
                if group.combination != combination {
                    info!("Group {} {} -> {}", id, group.combination, combination);
                    group.combination = combination;
                }
                true
            }
            None => false,
        }
    }

    /// Snapshot of a group
    pub fn group(&self, id: GroupId) -> Option<ScreenSessionGroup> {
        self.registry.read().groups.get(&id).cloned()
    }

    /// Snapshot of all groups, sorted by id
    pub fn groups(&self) -> Vec<ScreenSessionGroup> {
        let map = self.registry.read();
        let mut groups: Vec<_> = map.groups.values().cloned().collect();
        groups.sort_by_key(|g| g.id);
        groups
    }

    /// Group a session belongs to
    pub fn group_of(&self, id: LogicalScreenId) -> Option<ScreenSessionGroup> {
        let map = self.registry.read();
        let group_id = map.sessions.get(&id)?.group_id?;
        map.groups.get(&group_id).cloned()
    }
}

fn set_shared_combination(group: &mut ScreenSessionGroup, combination: Combination) {
    if matches!(
        combination,
        Combination::Mirror | Combination::Extend | Combination::Unique
    ) {
        group.combination = combination;
    }
}

/// Move one session into `group` and classify what happened to it
fn reconcile_member_locked(
    map: &mut ScreenMap,
    group: GroupId,
    id: LogicalScreenId,
    start: Point,
    combination: Combination,
    filter_unchanged: bool,
    outcome: &mut ReconcileOutcome,
) {
    let Some(session) = map.sessions.get(&id) else {
        warn!("reconcile_membership: unknown session {}", id);
        return;
    };
    let current_group = session.group_id;
    let same_combination = session.combination == combination;
    let anchor = map.groups.get(&group).and_then(|g| g.anchor);
    let cast = CastInfo {
        target: anchor.unwrap_or(id),
        combination,
    };

    if current_group == Some(group) {
        let same_start = map
            .groups
            .get(&group)
            .and_then(|g| g.members.iter().find(|m| m.id == id))
            .is_some_and(|m| m.start == start);
        let same_cast = map.cast_info.get(&id) == Some(&cast);
        if filter_unchanged && same_combination && (same_start || same_cast) {
            debug!("{} unchanged in group {}, skipping", id, group);
            return;
        }
        attach_locked(map, group, id, start, combination);
        outcome.changed.push(id);
    } else {
        if let Some(old) = current_group {
            detach_locked(map, id);
            debug!("{} left group {} for {}", id, old, group);
            outcome.removed.push(id);
        } else {
            outcome.added.push(id);
        }
        attach_locked(map, group, id, start, combination);
    }

    map.cast_info.insert(id, cast);
}

fn log_outcome(group: GroupId, combination: Combination, outcome: &ReconcileOutcome) {
    if !outcome.is_empty() {
        info!(
            "Reconciled group {} as {}: +{} -{} ~{}",
            group,
            combination,
            outcome.added.len(),
            outcome.removed.len(),
            outcome.changed.len()
        );
    }
}

fn anchor_role(combination: Combination) -> Combination {
    match combination {
        Combination::Mirror | Combination::Extend => Combination::Main,
        other => other,
    }
}

fn create_group_locked(
    map: &mut ScreenMap,
    combination: Combination,
    anchor: LogicalScreenId,
) -> GroupId {
    let id = GroupId(map.next_group);
    map.next_group += 1;
    map.groups
        .insert(id, ScreenSessionGroup::new(id, combination, anchor));
    id
}

/// Default offset for a session joining after the anchor
fn successor_start(map: &ScreenMap, group: GroupId, combination: Combination) -> Point {
    if combination != Combination::Extend {
        return Point::ORIGIN;
    }
    map.groups
        .get(&group)
        .and_then(|g| g.anchor)
        .and_then(|anchor| map.sessions.get(&anchor))
        .map(|anchor| {
            let width = i32::try_from(anchor.property.width).unwrap_or(i32::MAX);
            Point::new(anchor.property.position.x.saturating_add(width), anchor.property.position.y)
        })
        .unwrap_or(Point::ORIGIN)
}

/// Insert or update a member and its session fields
fn attach_locked(
    map: &mut ScreenMap,
    group: GroupId,
    id: LogicalScreenId,
    start: Point,
    combination: Combination,
) {
    let Some(target) = map.groups.get_mut(&group) else {
        return;
    };
    match target.members.iter_mut().find(|m| m.id == id) {
        Some(member) => member.start = start,
        None => target.members.push(GroupMember { id, start }),
    }
    if let Some(session) = map.sessions.get_mut(&id) {
        session.group_id = Some(group);
        session.combination = combination;
        session.is_extend = combination == Combination::Extend;
        session.property.position = start;
    }
}

/// Remove a member and clear its session fields
///
/// The group is left in the map even when empty; callers sweep once at the
/// end of the operation.
pub(crate) fn detach_locked(map: &mut ScreenMap, id: LogicalScreenId) -> Option<ScreenSessionGroup> {
    let session = map.sessions.get_mut(&id)?;
    let group_id = session.group_id.take()?;
    session.combination = Combination::Alone;
    session.is_extend = false;
    map.cast_info.remove(&id);

    let Some(group) = map.groups.get_mut(&group_id) else {
        warn!("{} referenced missing group {}", id, group_id);
        return None;
    };
    group.members.retain(|m| m.id != id);
    if group.anchor == Some(id) {
        group.anchor = group.members.first().map(|m| m.id);
    }
    debug!("{} removed from group {} ({} left)", id, group_id, group.members.len());
    Some(group.clone())
}

pub(crate) fn sweep_empty_groups_locked(map: &mut ScreenMap) {
    map.groups.retain(|id, group| {
        if group.members.is_empty() {
            info!("Deleted empty group {}", id);
            false
        } else {
            true
        }
    });
}
