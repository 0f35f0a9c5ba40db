//! Operation boundary macros
//!
//! Services log exactly one `start` and one `end`/`end_error` per
//! operation, all at the service boundary.

/// Log the start of an operation
///
/// ```
/// # use marquee_core::log_op_start;
/// log_op_start!("display.register");
/// log_op_start!("display.activate", display_id = "d1");
///
/// // Correlation ids from an operation context
/// let ctx = marquee_core::OpContext::new();
/// log_op_start!("rule.list", ctx = &ctx);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr, ctx = $ctx:expr) => {
        $crate::log_op_start!($op, ctx = $ctx,)
    };
    ($op:expr, ctx = $ctx:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::marquee_core_types::schema::EVENT_START,
            request_id = %$ctx.request_id(),
            trace_id = $ctx.trace_id().map(|t| t.as_str()),
            $($field)*
        );
    };
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::marquee_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::marquee_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use marquee_core::log_op_end;
/// log_op_end!("display.register", duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::marquee_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::marquee_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log a failed operation with its error classification
///
/// Expected failures (not found, invalid input, conflicts) log at `warn`;
/// store and internal failures at `error`.
///
/// ```
/// # use marquee_core::{log_op_error, MarqueeError};
/// let err = MarqueeError::RuleNotFound { rule_name: "promo".into() };
/// log_op_error!("rule.remove", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {
        $crate::log_op_error!($op, $err, duration_ms = $duration,)
    };
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err = $crate::errors::ExError::from(&$err);
        if $crate::logging_facility::macros::is_severe(ex_err.kind()) {
            tracing::error!(
                component = module_path!(),
                op = $op,
                event = $crate::marquee_core_types::schema::EVENT_END_ERROR,
                duration_ms = $duration,
                err_kind = ?ex_err.kind(),
                err_code = ex_err.code(),
                err_retryable = ex_err.is_retryable(),
                message = %ex_err.message(),
                $($field)*
            );
        } else {
            tracing::warn!(
                component = module_path!(),
                op = $op,
                event = $crate::marquee_core_types::schema::EVENT_END_ERROR,
                duration_ms = $duration,
                err_kind = ?ex_err.kind(),
                err_code = ex_err.code(),
                err_retryable = ex_err.is_retryable(),
                $($field)*
            );
        }
    }};
}

use crate::errors::ExErrorKind;

#[doc(hidden)]
pub fn is_severe(kind: ExErrorKind) -> bool {
    matches!(
        kind,
        ExErrorKind::Persistence | ExErrorKind::Serialization | ExErrorKind::Internal
    )
}
