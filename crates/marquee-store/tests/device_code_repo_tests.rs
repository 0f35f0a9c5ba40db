#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use chrono::Duration;
use common::{at, store};
use marquee_core::{DeviceCode, DeviceCodeRepository, MarqueeError};

fn code(id: &str, user_code: &str, created_secs: i64) -> DeviceCode {
    DeviceCode {
        id: id.to_string(),
        device_code: format!("device-secret-{}", id),
        user_code: user_code.to_string(),
        created_at: at(created_secs),
        expires_at: at(created_secs) + Duration::minutes(15),
        poll_interval_secs: 5,
        activated: false,
        activated_at: None,
        display_id: None,
    }
}

#[test]
fn test_lookup_by_either_secret() {
    let store = store();
    let c = code("c1", "ABCD-EFGH", 0);
    store.save_device_code(&c).unwrap();

    assert_eq!(store.find_by_device_code("device-secret-c1").unwrap(), Some(c.clone()));
    assert_eq!(store.find_by_user_code("ABCD-EFGH").unwrap(), Some(c));
    assert!(store.find_by_user_code("ZZZZ-ZZZZ").unwrap().is_none());
}

#[test]
fn test_user_code_collision_is_already_exists() {
    let store = store();
    store.save_device_code(&code("c1", "ABCD-EFGH", 0)).unwrap();
    assert!(matches!(
        store.save_device_code(&code("c2", "ABCD-EFGH", 0)),
        Err(MarqueeError::AlreadyExists { .. })
    ));
}

#[test]
fn test_activation_happens_once() {
    let store = store();
    store.save_device_code(&code("c1", "ABCD-EFGH", 0)).unwrap();

    let activated = store.mark_device_code_activated("c1", "disp-1", at(60)).unwrap();
    assert!(activated.activated);
    assert_eq!(activated.activated_at, Some(at(60)));
    assert_eq!(activated.display_id.as_deref(), Some("disp-1"));

    match store.mark_device_code_activated("c1", "disp-2", at(61)) {
        Err(MarqueeError::CodeAlreadyActive { display_id, .. }) => {
            assert_eq!(display_id.as_deref(), Some("disp-1"));
        }
        other => panic!("Expected CodeAlreadyActive, got {:?}", other),
    }
    assert!(matches!(
        store.mark_device_code_activated("nope", "disp-3", at(62)),
        Err(MarqueeError::DeviceCodeNotFound)
    ));
}

#[test]
fn test_purge_removes_only_expired() {
    let store = store();
    store.save_device_code(&code("old", "AAAA-AAAA", 0)).unwrap();
    store.save_device_code(&code("new", "BBBB-BBBB", 600)).unwrap();

    // "old" expires at 900s, "new" at 1500s
    assert_eq!(store.delete_expired_device_codes(at(900)).unwrap(), 1);
    assert!(store.find_by_user_code("AAAA-AAAA").unwrap().is_none());
    assert!(store.find_by_user_code("BBBB-BBBB").unwrap().is_some());

    store.delete_device_code("new").unwrap();
    assert!(matches!(
        store.delete_device_code("new"),
        Err(MarqueeError::DeviceCodeNotFound)
    ));
}
