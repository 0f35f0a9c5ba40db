#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::thread;

use common::{at, display, store};
use marquee_core::{DisplayRepository, DisplayState, Location, MarqueeError};

#[test]
fn test_insert_and_read_back() {
    let store = store();
    let mut d = display("d1", "lobby-1");
    d.properties.insert("brightness".into(), "80".into());
    d.last_seen = Some(at(30));
    assert_eq!(store.save_display(&d, None).unwrap(), 0);

    let loaded = store.find_display_by_id("d1").unwrap().unwrap();
    assert_eq!(loaded, d);
    assert_eq!(store.find_display_by_name("lobby-1").unwrap().unwrap().id, "d1");
}

#[test]
fn test_versioned_update_bumps_version() {
    let store = store();
    let mut d = display("d1", "lobby-1");
    store.save_display(&d, None).unwrap();

    d.state = DisplayState::Active;
    d.location = Location::new("hq", "atrium", "east");
    assert_eq!(store.save_display(&d, Some(0)).unwrap(), 1);

    let loaded = store.find_display_by_id("d1").unwrap().unwrap();
    assert_eq!(loaded.version, 1);
    assert_eq!(loaded.state, DisplayState::Active);
    assert_eq!(loaded.location.zone, "atrium");
}

#[test]
fn test_stale_version_is_rejected() {
    let store = store();
    let d = display("d1", "lobby-1");
    store.save_display(&d, None).unwrap();
    store.save_display(&d, Some(0)).unwrap();

    assert_eq!(
        store.save_display(&d, Some(0)),
        Err(MarqueeError::VersionConflict {
            display_id: "d1".into(),
            expected_version: 0
        })
    );
}

#[test]
fn test_update_of_missing_row_is_not_found() {
    let store = store();
    assert!(matches!(
        store.save_display(&display("ghost", "ghost"), Some(0)),
        Err(MarqueeError::DisplayNotFound { .. })
    ));
}

#[test]
fn test_duplicate_name_and_id() {
    let store = store();
    store.save_display(&display("d1", "lobby-1"), None).unwrap();
    assert!(matches!(
        store.save_display(&display("d2", "lobby-1"), None),
        Err(MarqueeError::DisplayNameTaken { .. })
    ));
    assert!(matches!(
        store.save_display(&display("d1", "lobby-2"), None),
        Err(MarqueeError::AlreadyExists { .. })
    ));
}

#[test]
fn test_list_is_ordered_by_name_and_delete_removes() {
    let store = store();
    store.save_display(&display("d2", "b-screen"), None).unwrap();
    store.save_display(&display("d1", "a-screen"), None).unwrap();
    let names: Vec<String> = store
        .list_displays()
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["a-screen", "b-screen"]);

    store.delete_display("d1").unwrap();
    assert!(store.find_display_by_id("d1").unwrap().is_none());
    assert!(matches!(
        store.delete_display("d1"),
        Err(MarqueeError::DisplayNotFound { .. })
    ));
}

#[test]
fn test_concurrent_writers_exactly_one_wins() {
    let store = Arc::new(store());
    let d = display("d1", "lobby-1");
    store.save_display(&d, None).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            let mut copy = d.clone();
            thread::spawn(move || {
                copy.properties.insert("writer".into(), i.to_string());
                store.save_display(&copy, Some(0))
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(MarqueeError::VersionConflict { .. })))
            .count(),
        7
    );
}
