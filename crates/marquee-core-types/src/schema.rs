//! Canonical schema constants for structured logging
//!
//! Every log line emitted by the engine uses these keys so that log queries
//! stay stable across crates.

pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Entity identifiers
pub const FIELD_DISPLAY_ID: &str = "display_id";
pub const FIELD_DISPLAY_NAME: &str = "display_name";
pub const FIELD_DISPLAY_VERSION: &str = "display_version";
pub const FIELD_CODE_ID: &str = "code_id";
pub const FIELD_USER_CODE: &str = "user_code";
pub const FIELD_RULE_NAME: &str = "rule_name";
pub const FIELD_PRIORITY: &str = "priority";

// Outcome fields
pub const FIELD_RULE_COUNT: &str = "rule_count";
pub const FIELD_ATTEMPT: &str = "attempt";
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";
pub const FIELD_ERR_RETRYABLE: &str = "err_retryable";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_RETRY: &str = "retry";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_distinct() {
        let names = [EVENT_START, EVENT_END, EVENT_END_ERROR, EVENT_RETRY];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
