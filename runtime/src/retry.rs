//! Re-running registration decisions after a ledger conflict.
//!
//! Every decision reads a roster snapshot and appends conditionally on that
//! snapshot's head. If another writer got there first the append fails with
//! a conflict, and the decision is made again against fresh records. The
//! [`RetryPolicy`] caps how many times and how quickly that happens.
//!
//! ```rust
//! use signup_ledger_runtime::retry::{RetryPolicy, retry_on_conflict};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let policy = RetryPolicy::builder()
//!     .max_retries(2)
//!     .initial_delay(Duration::from_millis(1))
//!     .build();
//!
//! let seat = retry_on_conflict(&policy, |_| async { Ok::<_, String>("seat 4") }, |_| false).await;
//! assert_eq!(seat, Ok("seat 4"));
//! # });
//! ```

use std::future::Future;
use std::time::Duration;

/// Backoff limits for conflicting appends.
///
/// Delays double from `initial_delay` and never exceed `max_delay`.
/// The default allows 3 retries starting at 10ms, capped at 500ms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one
    pub max_retries: usize,
    /// Pause before the first retry
    pub initial_delay: Duration,
    /// Upper bound on any single pause
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Start building a policy from the defaults.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            policy: RetryPolicy {
                max_retries: 3,
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(500),
            },
        }
    }

    /// Fail on the first conflict.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self::builder().max_retries(0).build()
    }

    /// Pause before retry number `retry` (zero-based).
    #[must_use]
    pub fn backoff(&self, retry: usize) -> Duration {
        let factor = 1u32 << retry.min(20);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl RetryPolicyBuilder {
    /// Retries allowed after the first attempt.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: usize) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    /// Pause before the first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.policy.initial_delay = delay;
        self
    }

    /// Cap for any single pause.
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.policy.max_delay = delay;
        self
    }

    /// Finish the policy.
    #[must_use]
    pub const fn build(self) -> RetryPolicy {
        self.policy
    }
}

/// Run `attempt` until it succeeds, fails with something other than a
/// conflict, or the policy runs out of retries.
///
/// `attempt` receives the zero-based attempt number.
///
/// # Errors
///
/// Returns the first non-conflict error, or the last conflict once retries
/// are exhausted.
pub async fn retry_on_conflict<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut attempt: F,
    is_conflict: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    for retry in 0..policy.max_retries {
        match attempt(retry).await {
            Err(err) if is_conflict(&err) => {
                let pause = policy.backoff(retry);
                tracing::debug!(retry, pause_ms = pause.as_millis(), error = %err, "Ledger moved, re-deciding");
                tokio::time::sleep(pause).await;
            }
            outcome => return outcome,
        }
    }

    attempt(policy.max_retries).await.inspect_err(|err| {
        if is_conflict(err) {
            tracing::warn!(retries = policy.max_retries, error = %err, "Gave up after repeated ledger conflicts");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick(max_retries: usize) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(max_retries)
            .initial_delay(Duration::from_millis(1))
            .build()
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(350))
            .build();

        let pauses: Vec<_> = (0..4).map(|n| policy.backoff(n).as_millis()).collect();
        assert_eq!(pauses, vec![100, 200, 350, 350]);
        assert_eq!(policy.backoff(usize::MAX), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn conflict_then_success() {
        let result = retry_on_conflict(
            &quick(3),
            |n| async move { if n < 2 { Err("conflict".to_string()) } else { Ok(n) } },
            |e: &String| e == "conflict",
        )
        .await;

        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn last_conflict_is_returned_when_retries_run_out() {
        let calls = AtomicUsize::new(0);

        let result = retry_on_conflict(
            &quick(2),
            |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err::<(), _>(format!("conflict {n}")) }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Err("conflict 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);

        let result = retry_on_conflict(
            &RetryPolicy::default(),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("not registered") }
            },
            |e: &&str| *e == "conflict",
        )
        .await;

        assert_eq!(result, Err("not registered"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_retry_policy_tries_once() {
        let calls = AtomicUsize::new(0);
        let _ = retry_on_conflict(
            &RetryPolicy::no_retry(),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("conflict") }
            },
            |_| true,
        )
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
