//! Bounded polling for instrument completion.
//
// The instrument signals the end of a single-sequence acquisition through the
// operation-complete bit. Polling it without a bound turns a hardware fault
// into a hung caller, so every wait goes through a `RetryPolicy`.

use crate::error::{ScopeError, ScopeResult};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::trace;

/// Defines a policy for repeating a status check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// The maximum number of checks before giving up.
    pub max_attempts: u32,
    /// The delay between consecutive checks.
    pub backoff_delay: Duration,
}

impl Default for RetryPolicy {
    /// 200 ms between `*opc?` polls, giving up after 30 s.
    fn default() -> Self {
        Self {
            max_attempts: 150,
            backoff_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and delay.
    pub fn new(max_attempts: u32, backoff_delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff_delay,
        }
    }

    /// Upper bound on the time spent sleeping between checks.
    pub fn budget(&self) -> Duration {
        self.backoff_delay
            .saturating_mul(self.max_attempts.saturating_sub(1))
    }
}

/// Something whose completion can be checked repeatedly.
#[async_trait]
pub trait CompletionProbe {
    /// Returns `Ok(true)` once the awaited operation has finished.
    async fn is_complete(&mut self) -> ScopeResult<bool>;
}

/// Checks `probe` until it reports completion or the policy is exhausted.
///
/// Returns the number of checks made. Errors from the probe abort the wait
/// immediately; exhausting the policy yields `ScopeError::OperationTimeout`.
pub async fn wait_for_completion<T: CompletionProbe + Send>(
    probe: &mut T,
    policy: &RetryPolicy,
) -> ScopeResult<u32> {
    let started = Instant::now();
    for attempt in 1..=policy.max_attempts {
        if probe.is_complete().await? {
            return Ok(attempt);
        }
        trace!(attempt, "operation not complete yet");
        if attempt < policy.max_attempts {
            sleep(policy.backoff_delay).await;
        }
    }
    Err(ScopeError::OperationTimeout {
        attempts: policy.max_attempts,
        waited: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockProbe {
        attempts: u32,
        complete_on_attempt: u32,
    }

    #[async_trait]
    impl CompletionProbe for MockProbe {
        async fn is_complete(&mut self) -> ScopeResult<bool> {
            self.attempts += 1;
            Ok(self.attempts >= self.complete_on_attempt)
        }
    }

    struct BrokenProbe;

    #[async_trait]
    impl CompletionProbe for BrokenProbe {
        async fn is_complete(&mut self) -> ScopeResult<bool> {
            Err(ScopeError::transport("*opc?", "link dropped"))
        }
    }

    #[tokio::test]
    async fn test_wait_succeeds_before_budget() {
        let mut probe = MockProbe {
            attempts: 0,
            complete_on_attempt: 2,
        };
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let attempts = wait_for_completion(&mut probe, &policy).await.unwrap();
        assert_eq!(attempts, 2);
        assert_eq!(probe.attempts, 2);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let mut probe = MockProbe {
            attempts: 0,
            complete_on_attempt: 4,
        };
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result = wait_for_completion(&mut probe, &policy).await;
        assert!(matches!(
            result,
            Err(ScopeError::OperationTimeout { attempts: 3, .. })
        ));
        assert_eq!(probe.attempts, 3);
    }

    #[tokio::test]
    async fn test_probe_error_aborts_wait() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let result = wait_for_completion(&mut BrokenProbe, &policy).await;
        assert!(matches!(result, Err(ScopeError::Transport { .. })));
    }

    #[test]
    fn test_default_policy_matches_instrument_cadence() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay, Duration::from_millis(200));
        assert_eq!(policy.budget(), Duration::from_millis(200 * 149));
    }
}
