//! Bounded retry with exponential backoff
//!
//! Only errors that report `is_retryable()` (concurrent modification) are
//! retried. The operation context is checked before every attempt, so a
//! cancelled or expired caller never starts another write.

use std::time::Duration;

use marquee_core::{OpContext, Result};
use marquee_core_types::schema::EVENT_RETRY;

use crate::config::RetryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each time after
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Retry immediately; used by tests and in-memory embedding
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay after the failed attempt number `attempt` (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Whether another attempt may follow attempt number `attempt`
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts.max(1)
    }
}

/// Run `f` until it succeeds, fails for good, or the policy runs out
///
/// # Errors
/// The last error from `f`, or `Cancelled`/`DeadlineExceeded` from the
/// context.
pub fn with_retry<T, F>(ctx: &OpContext, policy: &RetryPolicy, op: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        ctx.check(op)?;
        match f() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && policy.should_retry(attempt) => {
                let mut delay = policy.delay_for_attempt(attempt);
                if let Some(remaining) = ctx.remaining() {
                    delay = delay.min(remaining);
                }
                tracing::debug!(
                    component = module_path!(),
                    op,
                    event = EVENT_RETRY,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::{CancellationFlag, MarqueeError};

    fn conflict() -> MarqueeError {
        MarqueeError::VersionConflict {
            display_id: "d1".into(),
            expected_version: 0,
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(10));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(20));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(40));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(50));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(50));
    }

    #[test]
    fn test_retries_conflicts_until_success() {
        let mut calls = 0;
        let result = with_retry(&OpContext::new(), &RetryPolicy::immediate(3), "t", || {
            calls += 1;
            if calls < 3 {
                Err(conflict())
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<()> = with_retry(&OpContext::new(), &RetryPolicy::immediate(4), "t", || {
            calls += 1;
            Err(conflict())
        });
        assert_eq!(result, Err(conflict()));
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_non_retryable_errors_fail_immediately() {
        let mut calls = 0;
        let result: Result<()> = with_retry(&OpContext::new(), &RetryPolicy::immediate(5), "t", || {
            calls += 1;
            Err(MarqueeError::DisplayNotFound {
                display_id: "d1".into(),
            })
        });
        assert!(matches!(result, Err(MarqueeError::DisplayNotFound { .. })));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_cancelled_context_stops_before_first_attempt() {
        let flag = CancellationFlag::new();
        flag.cancel();
        let ctx = OpContext::new().with_cancellation(flag);
        let mut calls = 0;
        let result: Result<()> = with_retry(&ctx, &RetryPolicy::immediate(5), "t", || {
            calls += 1;
            Ok(())
        });
        assert!(matches!(result, Err(MarqueeError::Cancelled { .. })));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let mut calls = 0;
        let _: Result<()> = with_retry(&OpContext::new(), &RetryPolicy::immediate(0), "t", || {
            calls += 1;
            Err(conflict())
        });
        assert_eq!(calls, 1);
    }
}
