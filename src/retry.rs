//! Bounded retry loop with constant delay.
//!
//! One retry algorithm shared by the synchronous and asynchronous wrappers:
//! run an operation, feed the failure to a classifier, and either retry after
//! a fixed wait or stop with a terminal [`ResilienceError`]. The classifier
//! returns an explicit [`Decision`] instead of signalling through raised
//! errors, so the loop is a plain state transition over that value.
//!
//! Deliberately flat: no exponential backoff, no jitter, no circuit breaking.

use std::future::Future;
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::errors::{ResilienceError, Result};

/// Default number of attempts (the first try included).
pub const DEFAULT_TRY_COUNT: u32 = 10;

/// Default wait between a failed attempt and the next.
pub const DEFAULT_WAIT: Duration = Duration::from_millis(100);

/// Per-call retry configuration.
///
/// `try_count` is the total number of attempts, not the number of retries;
/// values below 1 are treated as 1. The wait is constant across attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub try_count: u32,
    pub wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            try_count: DEFAULT_TRY_COUNT,
            wait: DEFAULT_WAIT,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total attempt count.
    pub const fn with_try_count(mut self, try_count: u32) -> Self {
        self.try_count = try_count;
        self
    }

    /// Set the wait between attempts.
    pub const fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }
}

/// What the classifier decided about a caught error.
#[derive(Debug)]
pub enum Decision<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Transient failure; retry while attempts remain. Carries the error back
    /// so exhaustion can surface the last one.
    Retry(E),
    /// Terminal failure; stop now with this already-wrapped error.
    Fatal(ResilienceError<E>),
    /// The error was caused by cancellation; stop without wrapping.
    Cancelled,
}

/// Drive `op` until success, a fatal classification, or attempt exhaustion.
///
/// The inter-attempt wait blocks the calling thread.
pub fn retry_sync<T, E, Op, C>(policy: &RetryPolicy, mut op: Op, mut classify: C) -> Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
    Op: FnMut() -> std::result::Result<T, E>,
    C: FnMut(E) -> Decision<E>,
{
    let try_count = policy.try_count.max(1);
    let mut attempt = 1u32;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(raw) => match classify(raw) {
                Decision::Fatal(err) => return Err(err),
                Decision::Cancelled => return Err(ResilienceError::Cancelled),
                Decision::Retry(transient) => {
                    if attempt >= try_count {
                        warn!("giving up after {attempt} attempts: {transient}");
                        return Err(ResilienceError::RetriesExhausted {
                            attempts: attempt,
                            source: transient,
                        });
                    }
                    debug!(
                        "attempt {attempt}/{try_count} failed transiently ({transient}), retrying in {:?}",
                        policy.wait
                    );
                    attempt += 1;
                    thread::sleep(policy.wait);
                }
            },
        }
    }
}

/// Async counterpart of [`retry_sync`].
///
/// The inter-attempt wait suspends the task without blocking a worker thread.
/// Every stage — the operation future and the wait — is raced against the
/// cancellation token; a fired token ends the loop with
/// [`ResilienceError::Cancelled`] and no further attempts.
pub async fn retry_async<T, E, Op, Fut, C>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    mut op: Op,
    mut classify: C,
) -> Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
    Op: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    C: FnMut(E) -> Decision<E>,
{
    let try_count = policy.try_count.max(1);
    let mut attempt = 1u32;
    loop {
        if token.is_cancelled() {
            return Err(ResilienceError::Cancelled);
        }
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ResilienceError::Cancelled),
            outcome = op() => outcome,
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(raw) => match classify(raw) {
                Decision::Fatal(err) => return Err(err),
                Decision::Cancelled => return Err(ResilienceError::Cancelled),
                Decision::Retry(transient) => {
                    if attempt >= try_count {
                        warn!("giving up after {attempt} attempts: {transient}");
                        return Err(ResilienceError::RetriesExhausted {
                            attempts: attempt,
                            source: transient,
                        });
                    }
                    debug!(
                        "attempt {attempt}/{try_count} failed transiently ({transient}), retrying in {:?}",
                        policy.wait
                    );
                    attempt += 1;
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(ResilienceError::Cancelled),
                        _ = tokio::time::sleep(policy.wait) => {}
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Instant;
    use thiserror::Error;

    #[derive(Error, Debug)]
    enum TestError {
        #[error("busy")]
        Busy,
        #[error("broken")]
        Broken,
    }

    fn classify(err: TestError) -> Decision<TestError> {
        match err {
            TestError::Busy => Decision::Retry(err),
            TestError::Broken => Decision::Fatal(ResilienceError::Persistence { source: err }),
        }
    }

    #[test]
    fn test_success_takes_one_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, TestError> = retry_sync(
            &RetryPolicy::default(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("ok")
            },
            classify,
        );
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_always_transient_exhausts_try_count() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new()
            .with_try_count(4)
            .with_wait(Duration::from_millis(1));
        let result: Result<(), TestError> = retry_sync(
            &policy,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Busy)
            },
            classify,
        );
        match result.unwrap_err() {
            ResilienceError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 4);
                assert!(matches!(source, TestError::Busy));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_fatal_stops_after_first_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new()
            .with_try_count(5)
            .with_wait(Duration::from_secs(5));
        let started = Instant::now();
        let result: Result<(), TestError> = retry_sync(
            &policy,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Broken)
            },
            classify,
        );
        match result.unwrap_err() {
            ResilienceError::Persistence { source } => {
                assert!(matches!(source, TestError::Broken))
            }
            other => panic!("expected Persistence, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // No inter-attempt wait happened on the fatal path.
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_elapses_between_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new()
            .with_try_count(3)
            .with_wait(Duration::from_millis(10));
        let started = Instant::now();
        let result: Result<&str, TestError> = retry_sync(
            &policy,
            || {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TestError::Busy)
                } else {
                    Ok("ok")
                }
            },
            classify,
        );
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two waits of >= 10ms each preceded the successful attempt.
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_try_count_zero_still_attempts_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new().with_try_count(0);
        let result: Result<(), TestError> = retry_sync(
            &policy,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Busy)
            },
            classify,
        );
        assert_eq!(result.unwrap_err().attempts(), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_success_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new()
            .with_try_count(3)
            .with_wait(Duration::from_millis(1));
        let token = CancellationToken::new();
        let calls_op = calls.clone();
        let result: Result<&str, TestError> = retry_async(
            &policy,
            &token,
            move || {
                let calls = calls_op.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError::Busy)
                    } else {
                        Ok("ok")
                    }
                }
            },
            classify,
        )
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_async_cancel_during_wait_stops_retrying() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new()
            .with_try_count(5)
            .with_wait(Duration::from_secs(5));
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let started = Instant::now();
        let calls_op = calls.clone();
        let result: Result<(), TestError> = retry_async(
            &policy,
            &token,
            move || {
                let calls = calls_op.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Busy)
                }
            },
            classify,
        )
        .await;
        assert!(result.unwrap_err().is_cancelled());
        // Cancelled out of the 5s wait, not after it.
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_already_cancelled_skips_operation() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        token.cancel();
        let calls_op = calls.clone();
        let result: Result<(), TestError> = retry_async(
            &RetryPolicy::default(),
            &token,
            move || {
                let calls = calls_op.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Busy)
                }
            },
            classify,
        )
        .await;
        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
