mod common;

use common::{connect, disconnect, fast_config, RecordingRender};
use lamco_screen_coordinator::multiscreen::{MemorySettingsStore, MultiScreenMode};
use lamco_screen_coordinator::notify::{ClientEvent, EventRecorder, ScreenConnection};
use lamco_screen_coordinator::screen::{
    Combination, GroupId, GroupingEngine, IdentityMapper, LogicalScreenId, PhysicalSurfaceId,
    Point, ScreenKind, ScreenProperty, SessionRegistry,
};
use lamco_screen_coordinator::{ScreenError, ScreenSessionManager};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_connect_group_disconnect_release() {
    let mapper = Arc::new(IdentityMapper::new());
    let registry = Arc::new(SessionRegistry::new(Arc::clone(&mapper)));
    let grouping = GroupingEngine::new(Arc::clone(&registry), false);

    assert_eq!(mapper.allocate(PhysicalSurfaceId(100)), LogicalScreenId(1));
    let session = registry
        .create(PhysicalSurfaceId(100), ScreenKind::Real, ScreenProperty::with_size(1920, 1080))
        .unwrap();
    assert_eq!(session.id, LogicalScreenId(1));

    let group = grouping.add_to_group(LogicalScreenId(1), false).unwrap();
    assert_eq!(group.id, GroupId(1));
    assert_eq!(group.combination, Combination::Mirror);
    assert_eq!(group.anchor, Some(LogicalScreenId(1)));

    let after = grouping.remove_from_group(LogicalScreenId(1)).unwrap();
    assert!(after.is_empty());
    assert!(grouping.group(GroupId(1)).is_none());
    assert_eq!(registry.get(LogicalScreenId(1)).unwrap().group_id, None);

    registry.remove(LogicalScreenId(1));
    assert!(mapper.release(LogicalScreenId(1)));
    assert!(!mapper.release(LogicalScreenId(1)));
}

#[test]
fn test_manager_connect_and_disconnect() {
    let manager = ScreenSessionManager::new(
        &fast_config(),
        RecordingRender::new(),
        Arc::new(MemorySettingsStore::new()),
    )
    .unwrap();
    let events = Arc::new(EventRecorder::new());
    manager.register_listener(events.clone());

    let internal = manager
        .handle_hardware_event(connect(0, 2480, 2200, "", true))
        .unwrap()
        .unwrap();
    let external = manager
        .handle_hardware_event(connect(7, 1920, 1080, "MON-1", false))
        .unwrap()
        .unwrap();
    assert_eq!(internal, LogicalScreenId(1));
    assert_eq!(external, LogicalScreenId(2));

    let group = manager.grouping().group_of(internal).unwrap();
    assert!(group.contains(external));
    assert!(manager.registry().get(internal).unwrap().is_internal);

    let err = manager
        .handle_hardware_event(connect(7, 1920, 1080, "MON-1", false))
        .unwrap_err();
    assert!(matches!(err, ScreenError::DuplicateConnect(PhysicalSurfaceId(7))));

    let gone = manager.handle_hardware_event(disconnect(7)).unwrap();
    assert_eq!(gone, Some(external));
    assert!(manager.registry().get(external).is_none());
    assert_eq!(manager.registry().mapper().lookup_logical(PhysicalSurfaceId(7)), None);

    manager.flush_notifications(Duration::from_secs(1)).unwrap();
    let connections: Vec<_> = events
        .events()
        .into_iter()
        .filter_map(|event| match event {
            ClientEvent::ScreenConnectionChanged { id, connection } => Some((id, connection)),
            _ => None,
        })
        .collect();
    assert_eq!(
        connections,
        vec![
            (internal, ScreenConnection::Connected),
            (external, ScreenConnection::Connected),
            (external, ScreenConnection::Disconnected),
        ]
    );

    manager.shutdown();
}

#[test]
fn test_reconnect_restores_extended_topology() {
    let render = RecordingRender::new();
    let manager = ScreenSessionManager::new(
        &fast_config(),
        render.clone(),
        Arc::new(MemorySettingsStore::new()),
    )
    .unwrap();

    manager
        .handle_hardware_event(connect(0, 2480, 2200, "INT-0", true))
        .unwrap();
    manager
        .handle_hardware_event(connect(7, 1920, 1080, "MON-1", false))
        .unwrap();
    manager
        .multiscreen()
        .set_multi_screen_mode(PhysicalSurfaceId(0), PhysicalSurfaceId(7), MultiScreenMode::Extend)
        .unwrap();

    manager.handle_hardware_event(disconnect(7)).unwrap();
    let internal = manager
        .registry()
        .get_by_physical(PhysicalSurfaceId(0))
        .unwrap();
    assert_eq!(internal.combination, Combination::Main);
    assert_eq!(internal.property.position, Point::ORIGIN);
    let group = manager.grouping().group_of(internal.id).unwrap();
    assert_eq!(group.combination, Combination::Mirror);

    let again = manager
        .handle_hardware_event(connect(7, 1920, 1080, "MON-1", false))
        .unwrap()
        .unwrap();
    assert_eq!(again, LogicalScreenId(3));

    let restored = manager.registry().get(again).unwrap();
    assert_eq!(restored.combination, Combination::Extend);
    assert_eq!(restored.property.position, Point::new(2480, 0));
    assert_eq!(
        render.log().last().map(String::as_str),
        Some("position P0 P7 at (2480, 0)")
    );
}

#[test]
fn test_virtual_screen_gets_unique_group() {
    let manager = ScreenSessionManager::new(
        &fast_config(),
        RecordingRender::new(),
        Arc::new(MemorySettingsStore::new()),
    )
    .unwrap();
    manager
        .handle_hardware_event(connect(0, 2480, 2200, "", true))
        .unwrap();

    let id = manager
        .create_virtual_screen(ScreenProperty::with_size(1280, 720))
        .unwrap();
    let session = manager.registry().get(id).unwrap();
    assert_eq!(session.kind, ScreenKind::Virtual);
    let group = manager.grouping().group_of(id).unwrap();
    assert_eq!(group.combination, Combination::Unique);
    assert_eq!(group.anchor, Some(id));

    assert!(manager.destroy_virtual_screen(id));
    assert!(manager.registry().get(id).is_none());
    assert!(manager.grouping().group(group.id).is_none());
    assert!(!manager.destroy_virtual_screen(id));
}
