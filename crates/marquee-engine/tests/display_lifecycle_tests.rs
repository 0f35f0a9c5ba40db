mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Duration;
use common::{harness, harness_with, lobby_north, BrokenPublisher, ContendedRepo, ScriptedEntropy};
use marquee_core::events::LifecycleEventKind;
use marquee_core::{DisplayState, Location, MarqueeError, MemoryStore, OpContext};
use marquee_engine::{Clock, DisplayService, ManualClock, MarqueeConfig, RetryPolicy};

#[test]
fn test_register_then_activate() {
    let h = harness();
    let ctx = OpContext::new();

    let display = h
        .engine
        .displays
        .register(&ctx, "lobby-1", lobby_north())
        .unwrap();
    assert_eq!(display.state, DisplayState::Unregistered);
    assert_eq!(display.version, 0);

    let display = h.engine.displays.activate(&ctx, &display.id).unwrap();
    assert_eq!(display.state, DisplayState::Active);
    assert_eq!(display.version, 1);
    assert_eq!(display.last_seen, Some(h.clock.now()));

    assert_eq!(
        h.events.kinds(),
        vec![LifecycleEventKind::Registered, LifecycleEventKind::Activated]
    );
}

#[test]
fn test_register_rejects_blank_input_and_duplicates() {
    let h = harness();
    let ctx = OpContext::new();

    let err = h
        .engine
        .displays
        .register(&ctx, "  ", lobby_north())
        .unwrap_err();
    assert!(matches!(err, MarqueeError::InvalidInput { .. }));

    let err = h
        .engine
        .displays
        .register(&ctx, "lobby-1", Location::new("hq", "", "north"))
        .unwrap_err();
    assert!(matches!(err, MarqueeError::InvalidLocation { .. }));

    h.engine
        .displays
        .register(&ctx, "lobby-1", lobby_north())
        .unwrap();
    let err = h
        .engine
        .displays
        .register(&ctx, "lobby-1", lobby_north())
        .unwrap_err();
    assert!(matches!(err, MarqueeError::DisplayNameTaken { .. }));
    assert_eq!(h.events.kinds(), vec![LifecycleEventKind::Registered]);
}

#[test]
fn test_disabled_display_needs_force_reactivate() {
    let h = harness();
    let ctx = OpContext::new();
    let id = h
        .engine
        .displays
        .register(&ctx, "lobby-1", lobby_north())
        .unwrap()
        .id;
    h.engine.displays.activate(&ctx, &id).unwrap();
    h.engine.displays.disable(&ctx, &id).unwrap();

    let err = h.engine.displays.activate(&ctx, &id).unwrap_err();
    assert!(matches!(
        err,
        MarqueeError::InvalidTransition {
            from: DisplayState::Disabled,
            ..
        }
    ));

    let display = h.engine.displays.force_reactivate(&ctx, &id).unwrap();
    assert_eq!(display.state, DisplayState::Active);
    assert_eq!(display.version, 3);
    assert_eq!(
        h.events.kinds().last(),
        Some(&LifecycleEventKind::Reactivated)
    );
}

#[test]
fn test_operations_on_missing_display_are_not_found() {
    let h = harness();
    let ctx = OpContext::new();
    let d = &h.engine.displays;

    assert!(matches!(
        d.activate(&ctx, "ghost"),
        Err(MarqueeError::DisplayNotFound { .. })
    ));
    assert!(matches!(
        d.disable(&ctx, "ghost"),
        Err(MarqueeError::DisplayNotFound { .. })
    ));
    assert!(matches!(
        d.delete(&ctx, "ghost"),
        Err(MarqueeError::DisplayNotFound { .. })
    ));
    assert!(matches!(
        d.get_by_name(&ctx, "ghost"),
        Err(MarqueeError::DisplayNotFound { .. })
    ));
    assert!(h.events.kinds().is_empty());
}

#[test]
fn test_offline_is_derived_then_cleared_by_contact() {
    let mut config = MarqueeConfig::default();
    config.displays.offline_after_secs = 60;
    let h = harness_with(
        Arc::new(MemoryStore::new()),
        ScriptedEntropy::default(),
        config,
    );
    let ctx = OpContext::new();
    let id = h
        .engine
        .displays
        .register(&ctx, "lobby-1", lobby_north())
        .unwrap()
        .id;
    h.engine.displays.activate(&ctx, &id).unwrap();

    h.clock.advance(Duration::seconds(60));
    assert_eq!(
        h.engine.displays.effective_state(&ctx, &id).unwrap(),
        DisplayState::Active
    );

    h.clock.advance(Duration::seconds(1));
    assert_eq!(
        h.engine.displays.effective_state(&ctx, &id).unwrap(),
        DisplayState::Offline
    );
    // Derived state never touches the stored row
    assert_eq!(
        h.engine.displays.get(&ctx, &id).unwrap().state,
        DisplayState::Active
    );

    h.engine.displays.update_last_seen(&ctx, &id).unwrap();
    assert_eq!(
        h.engine.displays.effective_state(&ctx, &id).unwrap(),
        DisplayState::Active
    );
}

#[test]
fn test_explicit_offline_then_reconnect() {
    let h = harness();
    let ctx = OpContext::new();
    let id = h
        .engine
        .displays
        .register(&ctx, "lobby-1", lobby_north())
        .unwrap()
        .id;

    let err = h.engine.displays.mark_offline(&ctx, &id).unwrap_err();
    assert!(matches!(err, MarqueeError::InvalidTransition { .. }));

    h.engine.displays.activate(&ctx, &id).unwrap();
    let display = h.engine.displays.mark_offline(&ctx, &id).unwrap();
    assert_eq!(display.state, DisplayState::Offline);

    let display = h.engine.displays.update_last_seen(&ctx, &id).unwrap();
    assert_eq!(display.state, DisplayState::Active);

    assert_eq!(
        h.events.kinds(),
        vec![
            LifecycleEventKind::Registered,
            LifecycleEventKind::Activated,
            LifecycleEventKind::WentOffline,
            LifecycleEventKind::Reconnected,
        ]
    );
}

#[test]
fn test_heartbeat_on_active_display_publishes_nothing() {
    let h = harness();
    let ctx = OpContext::new();
    let id = h
        .engine
        .displays
        .register(&ctx, "lobby-1", lobby_north())
        .unwrap()
        .id;
    h.engine.displays.activate(&ctx, &id).unwrap();

    h.clock.advance(Duration::seconds(30));
    let display = h.engine.displays.update_last_seen(&ctx, &id).unwrap();
    assert_eq!(display.version, 2);
    assert_eq!(display.last_seen, Some(h.clock.now()));
    assert_eq!(h.events.kinds().len(), 2);
}

#[test]
fn test_location_and_properties() {
    let h = harness();
    let ctx = OpContext::new();
    let id = h
        .engine
        .displays
        .register(&ctx, "lobby-1", lobby_north())
        .unwrap()
        .id;

    let err = h
        .engine
        .displays
        .update_location(&ctx, &id, Location::new("hq", "lobby", " "))
        .unwrap_err();
    assert!(matches!(err, MarqueeError::InvalidLocation { .. }));

    let display = h
        .engine
        .displays
        .update_location(&ctx, &id, Location::new("hq", "cafe", "east"))
        .unwrap();
    assert_eq!(display.location.zone, "cafe");

    h.engine
        .displays
        .set_property(&ctx, &id, "orientation", "portrait")
        .unwrap();
    let display = h
        .engine
        .displays
        .set_property(&ctx, &id, "brightness", "80")
        .unwrap();
    assert_eq!(display.properties.len(), 2);
    assert_eq!(display.properties["orientation"], "portrait");

    let display = h
        .engine
        .displays
        .remove_property(&ctx, &id, "orientation")
        .unwrap();
    assert!(!display.properties.contains_key("orientation"));
    assert_eq!(display.version, 4);

    let err = h
        .engine
        .displays
        .remove_property(&ctx, &id, "orientation")
        .unwrap_err();
    assert!(matches!(err, MarqueeError::InvalidInput { .. }));
    let err = h
        .engine
        .displays
        .set_property(&ctx, &id, "", "x")
        .unwrap_err();
    assert!(matches!(err, MarqueeError::InvalidInput { .. }));

    assert_eq!(
        h.events.kinds(),
        vec![
            LifecycleEventKind::Registered,
            LifecycleEventKind::LocationChanged
        ]
    );
}

#[test]
fn test_delete_is_terminal() {
    let h = harness();
    let ctx = OpContext::new();
    let id = h
        .engine
        .displays
        .register(&ctx, "lobby-1", lobby_north())
        .unwrap()
        .id;

    h.engine.displays.delete(&ctx, &id).unwrap();
    assert!(matches!(
        h.engine.displays.get(&ctx, &id),
        Err(MarqueeError::DisplayNotFound { .. })
    ));
    assert!(h.engine.displays.list(&ctx).unwrap().is_empty());
    assert_eq!(
        h.events.kinds().last(),
        Some(&LifecycleEventKind::Deleted)
    );

    // The name is free again
    h.engine
        .displays
        .register(&ctx, "lobby-1", lobby_north())
        .unwrap();
}

#[test]
fn test_publish_failure_does_not_fail_the_transition() {
    let repo = Arc::new(MemoryStore::new());
    let service = DisplayService::new(
        repo,
        Arc::new(BrokenPublisher),
        Arc::new(ManualClock::new(common::tuesday(9, 0))),
        &MarqueeConfig::default(),
    );
    let ctx = OpContext::new();

    let display = service.register(&ctx, "lobby-1", lobby_north()).unwrap();
    let display = service.activate(&ctx, &display.id).unwrap();
    assert_eq!(display.state, DisplayState::Active);
}

#[test]
fn test_version_conflicts_are_retried() {
    let repo = Arc::new(ContendedRepo::new(2));
    let h = harness_with(repo.clone(), ScriptedEntropy::default(), MarqueeConfig::default());
    let ctx = OpContext::new();
    let id = h
        .engine
        .displays
        .register(&ctx, "lobby-1", lobby_north())
        .unwrap()
        .id;

    let display = h.engine.displays.activate(&ctx, &id).unwrap();
    assert_eq!(display.version, 1);
    assert_eq!(repo.attempts.load(Ordering::SeqCst), 3);
    // One event, however many attempts it took
    assert_eq!(h.events.kinds().len(), 2);
}

#[test]
fn test_conflict_surfaces_after_retry_budget() {
    let repo = Arc::new(ContendedRepo::new(10));
    let h = harness_with(repo.clone(), ScriptedEntropy::default(), MarqueeConfig::default());
    let displays = h
        .engine
        .displays
        .clone()
        .with_retry_policy(RetryPolicy::immediate(3));
    let ctx = OpContext::new();
    let id = displays.register(&ctx, "lobby-1", lobby_north()).unwrap().id;

    let err = displays.activate(&ctx, &id).unwrap_err();
    assert!(matches!(err, MarqueeError::VersionConflict { .. }));
    assert!(err.is_retryable());
    assert_eq!(repo.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(
        displays.get(&ctx, &id).unwrap().state,
        DisplayState::Unregistered
    );
}

#[test]
fn test_cancelled_context_writes_nothing() {
    let h = harness();
    let ctx = OpContext::new();
    let id = h
        .engine
        .displays
        .register(&ctx, "lobby-1", lobby_north())
        .unwrap()
        .id;

    let cancelled = OpContext::new();
    cancelled.cancellation().cancel();
    let err = h.engine.displays.disable(&cancelled, &id).unwrap_err();
    assert!(matches!(err, MarqueeError::Cancelled { .. }));

    let display = h.engine.displays.get(&ctx, &id).unwrap();
    assert_eq!(display.state, DisplayState::Unregistered);
    assert_eq!(display.version, 0);
}
