//! Per-operation context: deadline, cancellation and correlation
//!
//! Services call `OpContext::check` right before every store write and
//! between retries. Writes are single statements or single transactions, so
//! an operation stopped by `check` leaves nothing partially applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use marquee_core_types::{RequestId, TraceId};

use crate::errors::{MarqueeError, Result};

/// Shared flag a caller flips to abandon in-flight operations
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancellation: CancellationFlag,
    request_id: RequestId,
    trace_id: Option<TraceId>,
}

impl OpContext {
    /// Context with no deadline and a fresh request id
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Time left before the deadline; `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fail fast if the caller gave up
    ///
    /// # Errors
    /// `Cancelled` once the flag is set, `DeadlineExceeded` once the deadline
    /// has passed. Cancellation wins when both apply.
    pub fn check(&self, op: &str) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(MarqueeError::Cancelled { op: op.to_string() });
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(MarqueeError::DeadlineExceeded { op: op.to_string() });
            }
        }
        Ok(())
    }
}
