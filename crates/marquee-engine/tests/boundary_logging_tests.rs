mod common;

use common::{harness, lobby_north, rule};
use marquee_core::logging_facility::init_test_capture;
use marquee_core::{DisplaySelector, OpContext};
use marquee_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use marquee_core_types::{RequestId, TraceId};
use tracing::Level;

// Single test: the capture layer is process-global
#[test]
fn test_services_log_one_start_and_one_outcome_per_operation() {
    let capture = init_test_capture();
    let h = harness();
    let ctx = OpContext::new();

    let id = h
        .engine
        .displays
        .register(&ctx, "lobby-1", lobby_north())
        .unwrap()
        .id;
    let register = capture.events_for("display.register");
    assert_eq!(register.len(), 2);
    assert_eq!(register[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(register[0].field("display_name"), Some("lobby-1"));
    assert_eq!(register[1].event.as_deref(), Some(EVENT_END));
    assert!(register[1].field("duration_ms").is_some());
    for event in &register {
        assert_eq!(event.field("request_id"), Some(ctx.request_id().as_str()));
        assert!(event.field("trace_id").is_none());
    }

    h.engine.displays.disable(&ctx, &id).unwrap();
    let _ = h.engine.displays.activate(&ctx, &id).unwrap_err();
    let activate = capture.events_for("display.activate");
    assert_eq!(activate.len(), 2);
    assert_eq!(activate[1].event.as_deref(), Some(EVENT_END_ERROR));
    assert_eq!(activate[1].level, Level::WARN);
    assert_eq!(activate[1].field("err_code"), Some("ERR_INVALID_TRANSITION"));

    h.engine
        .rules
        .add(&ctx, rule("promo", 10, DisplaySelector::any()))
        .unwrap();
    let _ = h
        .engine
        .rules
        .add(&ctx, rule("other", 10, DisplaySelector::any()))
        .unwrap_err();
    let errors = capture.count_events(|e| {
        e.op.as_deref() == Some("rule.add") && e.event.as_deref() == Some(EVENT_END_ERROR)
    });
    assert_eq!(errors, 1);
    capture.assert_event_exists("rule.add", EVENT_END);

    // Upstream correlation ids reach both boundary events, failures included
    let upstream = OpContext::new()
        .with_request_id(RequestId::from_upstream("req-42"))
        .with_trace_id(TraceId::from_upstream("pairing-7"));
    let _ = h.engine.rules.remove(&upstream, "ghost").unwrap_err();
    let remove = capture.events_for("rule.remove");
    assert_eq!(remove.len(), 2);
    assert_eq!(remove[1].event.as_deref(), Some(EVENT_END_ERROR));
    for event in &remove {
        assert_eq!(event.field("request_id"), Some("req-42"));
        assert_eq!(event.field("trace_id"), Some("pairing-7"));
    }
}
