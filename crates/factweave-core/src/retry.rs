//! Retry policy and backoff combinator.
//!
//! All networked ingestion paths (single episode, bulk, per-chunk) apply the
//! same policy through [`retry`], instead of open-coding nested retry loops
//! at each call site.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::defaults;
use crate::error::{Error, Result};

/// Exponential-backoff retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Base delay in milliseconds, doubled per attempt.
    pub base_delay_ms: u64,
    /// Delay ceiling in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::RETRY_MAX_ATTEMPTS,
            base_delay_ms: defaults::RETRY_BASE_DELAY_MS,
            max_delay_ms: defaults::RETRY_MAX_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a custom attempt budget and default backoff.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Backoff delay before retrying after the given 1-based attempt:
    /// `min(base · 2^(attempt-1), max)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63);
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

/// Run `op` under the given policy, sleeping between attempts.
///
/// Non-retryable errors (conflicts, validation) abort immediately; only
/// transient failures consume the attempt budget.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, op_name: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_err: Option<Error> = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                warn!(
                    op = op_name,
                    attempt,
                    max_attempts = attempts,
                    error = %err,
                    "Attempt failed"
                );
                last_err = Some(err);
                if attempt < attempts {
                    sleep(policy.delay_for_attempt(attempt)).await;
                }
            }
        }
    }

    Err(last_err.unwrap_or_else(|| Error::Internal(format!("{op_name}: no attempts made"))))
}
