#![allow(clippy::unwrap_used, clippy::expect_used)]

use marquee_core::errors::MarqueeError;
use marquee_core::logging_facility::init_test_capture;
use marquee_core::{log_op_end, log_op_error, log_op_start, OpContext};
use marquee_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use marquee_core_types::{RequestId, TraceId};
use tracing::Level;

#[test]
fn test_start_event_carries_extra_fields() {
    let capture = init_test_capture();
    let op = "logging_test.start_fields";

    log_op_start!(op, display_id = "d-42");

    let events = capture.events_for(op);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(events[0].field("display_id"), Some("d-42"));
    assert!(events[0].component.is_some());
}

#[test]
fn test_start_event_carries_context_correlation_ids() {
    let capture = init_test_capture();
    let op = "logging_test.correlation";

    let ctx = OpContext::new()
        .with_request_id(RequestId::from_upstream("req-1"))
        .with_trace_id(TraceId::from_upstream("trace-1"));
    log_op_start!(op, ctx = &ctx, rule_name = "promo");
    let fresh = OpContext::new();
    log_op_start!(op, ctx = &fresh);

    let events = capture.events_for(op);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].field("request_id"), Some("req-1"));
    assert_eq!(events[0].field("trace_id"), Some("trace-1"));
    assert_eq!(events[0].field("rule_name"), Some("promo"));
    assert_eq!(events[1].field("request_id"), Some(fresh.request_id().as_str()));
    assert!(events[1].field("trace_id").is_none());
}

#[test]
fn test_end_event_records_duration() {
    let capture = init_test_capture();
    let op = "logging_test.end_duration";

    log_op_end!(op, duration_ms = 42u64);

    capture.assert_event_exists(op, EVENT_END);
    assert_eq!(capture.events_for(op)[0].field("duration_ms"), Some("42"));
}

#[test]
fn test_expected_failure_logs_warn_with_code() {
    let capture = init_test_capture();
    let op = "logging_test.not_found";

    let err = MarqueeError::RuleNotFound {
        rule_name: "promo".into(),
    };
    log_op_error!(op, err, duration_ms = 1u64);

    let events = capture.events_for(op);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_END_ERROR));
    assert_eq!(events[0].level, Level::WARN);
    assert_eq!(events[0].field("err_code"), Some("ERR_NOT_FOUND"));
    assert_eq!(events[0].field("err_retryable"), Some("false"));
}

#[test]
fn test_conflict_is_flagged_retryable() {
    let capture = init_test_capture();
    let op = "logging_test.conflict";

    let err = MarqueeError::VersionConflict {
        display_id: "d1".into(),
        expected_version: 3,
    };
    log_op_error!(op, err, duration_ms = 2u64, display_id = "d1");

    let event = &capture.events_for(op)[0];
    assert_eq!(event.field("err_code"), Some("ERR_VERSION_CONFLICT"));
    assert_eq!(event.field("err_retryable"), Some("true"));
    assert_eq!(event.field("display_id"), Some("d1"));
}

#[test]
fn test_store_failure_logs_error_level() {
    let capture = init_test_capture();
    let op = "logging_test.persistence";

    let err = MarqueeError::Persistence {
        op: "save_display".into(),
        message: "disk I/O error".into(),
    };
    log_op_error!(op, err, duration_ms = 5u64);

    let event = &capture.events_for(op)[0];
    assert_eq!(event.level, Level::ERROR);
    assert_eq!(event.field("err_kind"), Some("Persistence"));
}
