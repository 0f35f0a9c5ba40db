//! Marquee Engine - service layer over the core kernel and a store
//!
//! Each service owns lifecycle logging for its operations:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Lower layers (store, core) only emit `tracing::debug!()` details.

#![allow(clippy::result_large_err)]

/// Run `$body` and log its outcome as the end of `$op`
///
/// `$body` must evaluate to `marquee_core::Result<T>`; the result is handed
/// back untouched. Outcome events carry the correlation ids of `$ctx`.
macro_rules! traced {
    ($op:expr, $ctx:expr, $body:expr) => {{
        let start = std::time::Instant::now();
        match $body {
            Ok(value) => {
                marquee_core::log_op_end!(
                    $op,
                    duration_ms = start.elapsed().as_millis() as u64,
                    request_id = %$ctx.request_id(),
                    trace_id = $ctx.trace_id().map(|t| t.as_str()),
                );
                Ok(value)
            }
            Err(err) => {
                marquee_core::log_op_error!(
                    $op,
                    err,
                    duration_ms = start.elapsed().as_millis() as u64,
                    request_id = %$ctx.request_id(),
                    trace_id = $ctx.trace_id().map(|t| t.as_str()),
                );
                Err(err)
            }
        }
    }};
}

pub mod activation;
pub mod clock;
pub mod config;
pub mod displays;
pub mod engine;
pub mod resolver;
pub mod retry;
pub mod rules;

pub use activation::ActivationService;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MarqueeConfig;
pub use displays::DisplayService;
pub use engine::Engine;
pub use resolver::Resolver;
pub use retry::{with_retry, RetryPolicy};
pub use rules::RuleService;
