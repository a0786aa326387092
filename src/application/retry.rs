//! Retry/Backoff Executor
//!
//! Wraps calls to external collaborators with bounded retries and
//! exponential backoff. Failures are classified as retryable or fatal:
//! fatal failures abort at once, retryable ones wait
//! `base_delay * 2^(attempt-1)` (capped, plus optional jitter) and try again
//! until `max_attempts` calls have been made.
//!
//! Backoff waits race the shutdown signal. Cancellation is reported as
//! [`RetryError::Cancelled`], never as success or as a provider error.

use rand::Rng;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use super::shutdown::ShutdownSignal;
use crate::ports::{Classify, FailureClass};

/// Terminal failure of a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: fmt::Debug + fmt::Display,
{
    #[error("fatal failure on attempt {attempts}: {error}")]
    Fatal { error: E, attempts: u32 },

    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted { last: E, attempts: u32 },

    #[error("cancelled by shutdown after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E>
where
    E: fmt::Debug + fmt::Display,
{
    /// Number of calls made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Fatal { attempts, .. }
            | RetryError::Exhausted { attempts, .. }
            | RetryError::Cancelled { attempts } => *attempts,
        }
    }

    /// Last provider error, if any
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Fatal { error, .. } => Some(error),
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Cancelled { .. } => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, RetryError::Fatal { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total calls allowed, first attempt included
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound on a single backoff delay (before jitter)
    pub max_delay: Duration,
    /// Random extra delay in `[0, jitter]`
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            jitter: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Default::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Backoff after failed attempt `attempt` (1-based), without jitter
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter.is_zero() {
            return delay;
        }
        let extra_ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        delay + Duration::from_millis(extra_ms)
    }

    /// Run `operation` using the error's own classification
    pub async fn execute<T, E, F, Fut>(
        &self,
        shutdown: &ShutdownSignal,
        operation: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Classify + fmt::Debug + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with(shutdown, operation, |e: &E| e.classify()).await
    }

    /// Run `operation`, classifying failures with `classify`
    pub async fn execute_with<T, E, F, Fut, C>(
        &self,
        shutdown: &ShutdownSignal,
        mut operation: F,
        classify: C,
    ) -> Result<T, RetryError<E>>
    where
        E: fmt::Debug + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> FailureClass,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            if shutdown.is_triggered() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }

            attempt += 1;
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if classify(&error) == FailureClass::Fatal {
                return Err(RetryError::Fatal { error, attempts: attempt });
            }

            if attempt >= max_attempts {
                return Err(RetryError::Exhausted { last: error, attempts: attempt });
            }

            let delay = self.jittered(self.backoff_for(attempt));
            tracing::debug!(
                "Retryable failure ({}), backing off for {:?} (attempt {}/{})",
                error,
                delay,
                attempt,
                max_attempts
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.triggered() => {
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::shutdown::shutdown_channel;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use thiserror::Error;

    #[derive(Debug, Error, Clone, PartialEq)]
    enum TestError {
        #[error("transient")]
        Transient,
        #[error("permanent")]
        Permanent,
    }

    impl Classify for TestError {
        fn classify(&self) -> FailureClass {
            match self {
                TestError::Transient => FailureClass::Retryable,
                TestError::Permanent => FailureClass::Fatal,
            }
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(100))
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = policy(3)
            .execute(&ShutdownSignal::never(), || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(TestError::Transient)
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_aborts_after_one_call() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = policy(3)
            .execute(&ShutdownSignal::never(), || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Permanent) }
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.attempts(), 1);
        assert_eq!(err.last_error(), Some(&TestError::Permanent));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = policy(4)
            .execute(&ShutdownSignal::never(), || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Transient) }
            })
            .await;

        match result.unwrap_err() {
            RetryError::Exhausted { last, attempts } => {
                assert_eq!(last, TestError::Transient);
                assert_eq!(attempts, 4);
            }
            e => panic!("Expected Exhausted, got {:?}", e),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_between_attempts() {
        let start = tokio::time::Instant::now();

        let result: Result<(), _> = policy(4)
            .execute(&ShutdownSignal::never(), || async { Err(TestError::Transient) })
            .await;

        assert!(result.is_err());
        // Waits of 100 + 200 + 400 ms, none after the last attempt
        assert_eq!(start.elapsed(), Duration::from_millis(700));
    }

    #[test]
    fn test_backoff_schedule_and_cap() {
        let p = RetryPolicy::new(10, Duration::from_secs(2)).with_max_delay(Duration::from_secs(10));
        assert_eq!(p.backoff_for(1), Duration::from_secs(2));
        assert_eq!(p.backoff_for(2), Duration::from_secs(4));
        assert_eq!(p.backoff_for(3), Duration::from_secs(8));
        assert_eq!(p.backoff_for(4), Duration::from_secs(10));
        assert_eq!(p.backoff_for(64), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_stays_within_bounds() {
        let p = policy(2).with_jitter(Duration::from_millis(50));
        let start = tokio::time::Instant::now();

        let result: Result<(), _> = p
            .execute(&ShutdownSignal::never(), || async { Err(TestError::Transient) })
            .await;

        assert!(result.is_err());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed <= Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_classifier_overrides_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        // Treat everything as fatal regardless of the error's own classification
        let result: Result<(), _> = policy(5)
            .execute_with(
                &ShutdownSignal::never(),
                || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err(TestError::Transient) }
                },
                |_| FailureClass::Fatal,
            )
            .await;

        assert!(result.unwrap_err().is_fatal());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_backoff() {
        let (handle, signal) = shutdown_channel();
        let p = RetryPolicy::new(5, Duration::from_secs(3600));

        let task = tokio::spawn(async move {
            p.execute(&signal, || async { Err::<(), _>(TestError::Transient) }).await
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.trigger();

        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.attempts(), 1);
    }

    #[tokio::test]
    async fn test_no_call_when_already_shut_down() {
        let (handle, signal) = shutdown_channel();
        handle.trigger();

        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = policy(3)
            .execute(&signal, || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), TestError>(()) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 0 })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
