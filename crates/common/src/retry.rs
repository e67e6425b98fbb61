//! Generic retry helper for fallible async operations.
//!
//! The envelope core never retries internally; callers compose this helper
//! around whole operations instead.
//!
//! ```text
//! attempt 0 ──fail──► sleep(delay) ──► attempt 1 ──fail──► sleep(2·delay) ──► …
//! ```
//!
//! `max_retries` counts retries *after* the first attempt, so the default of
//! 5 allows 6 attempts in total.

use std::future::Future;
use std::time::Duration;

use tokio::time;

/// Timing parameters for [`Retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Base delay between attempts.
    pub delay: Duration,
    /// Double the delay after every attempt.
    pub exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_millis(200),
            exponential_backoff: true,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the zero-based `attempt` before trying again.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.exponential_backoff {
            self.delay.saturating_mul(2u32.saturating_pow(attempt))
        } else {
            self.delay
        }
    }

    /// Sum of every back-off sleep when all attempts fail.
    pub fn total_delay(&self) -> Duration {
        (0..self.max_retries)
            .map(|attempt| self.delay_for(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

type Predicate<'a, V> = Box<dyn Fn(&V) -> bool + Send + Sync + 'a>;
type RetryHook<'a, E> = Box<dyn Fn(u32, Option<&E>) + Send + Sync + 'a>;

/// A configured retry loop.
///
/// # Example
///
/// ```no_run
/// # async fn fetch() -> Result<u32, std::io::Error> { Ok(1) }
/// # async fn demo() -> Result<(), std::io::Error> {
/// use common::{Retry, RetryPolicy};
///
/// let value = Retry::new(RetryPolicy::default())
///     .abort_if(|e: &std::io::Error| e.kind() == std::io::ErrorKind::NotFound)
///     .run(fetch)
///     .await?;
/// # let _ = value;
/// # Ok(())
/// # }
/// ```
pub struct Retry<'a, T, E> {
    policy: RetryPolicy,
    succeed_if: Option<Predicate<'a, T>>,
    abort_if: Option<Predicate<'a, E>>,
    on_retry: Option<RetryHook<'a, E>>,
}

impl<'a, T, E> Retry<'a, T, E> {
    /// Create a retry loop with no hooks installed.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            succeed_if: None,
            abort_if: None,
            on_retry: None,
        }
    }

    /// Treat an `Ok` value as final only when `pred` returns `true`.
    ///
    /// Rejected values are retried; once attempts run out the last value is
    /// returned regardless.
    pub fn succeed_if(mut self, pred: impl Fn(&T) -> bool + Send + Sync + 'a) -> Self {
        self.succeed_if = Some(Box::new(pred));
        self
    }

    /// Stop immediately and return any error for which `pred` returns `true`.
    pub fn abort_if(mut self, pred: impl Fn(&E) -> bool + Send + Sync + 'a) -> Self {
        self.abort_if = Some(Box::new(pred));
        self
    }

    /// Called before every retry with the 1-based retry number and the error
    /// that triggered it (`None` when a value was rejected by `succeed_if`).
    pub fn on_retry(mut self, hook: impl Fn(u32, Option<&E>) + Send + Sync + 'a) -> Self {
        self.on_retry = Some(Box::new(hook));
        self
    }

    /// Drive `op` until it succeeds, aborts, or attempts are exhausted.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt, or the first error matched by
    /// [`Retry::abort_if`].
    pub async fn run<F, Fut>(self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => {
                    let accepted = self.succeed_if.as_ref().map_or(true, |pred| pred(&value));
                    if accepted || attempt >= self.policy.max_retries {
                        return Ok(value);
                    }
                    if let Some(hook) = &self.on_retry {
                        hook(attempt + 1, None);
                    }
                }
                Err(err) => {
                    if self.abort_if.as_ref().is_some_and(|pred| pred(&err)) {
                        return Err(err);
                    }
                    if attempt >= self.policy.max_retries {
                        return Err(err);
                    }
                    if let Some(hook) = &self.on_retry {
                        hook(attempt + 1, Some(&err));
                    }
                }
            }
            time::sleep(self.policy.delay_for(attempt)).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            delay: Duration::from_millis(100),
            exponential_backoff: true,
        }
    }

    #[test]
    fn default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_retries, 5);
        assert_eq!(p.delay, Duration::from_millis(200));
        assert!(p.exponential_backoff);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let p = fast(3);
        assert_eq!(p.delay_for(0), Duration::from_millis(100));
        assert_eq!(p.delay_for(1), Duration::from_millis(200));
        assert_eq!(p.delay_for(3), Duration::from_millis(800));

        let flat = RetryPolicy {
            exponential_backoff: false,
            ..p
        };
        assert_eq!(flat.delay_for(3), Duration::from_millis(100));
    }

    #[test]
    fn total_delay_sums_every_backoff() {
        assert_eq!(
            RetryPolicy::default().total_delay(),
            Duration::from_millis(200 + 400 + 800 + 1600 + 3200)
        );
        let flat = RetryPolicy {
            exponential_backoff: false,
            ..fast(3)
        };
        assert_eq!(flat.total_delay(), Duration::from_millis(300));
        assert_eq!(fast(0).total_delay(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let mut calls = 0u32;
        let started = time::Instant::now();
        let result: Result<u32, &str> = Retry::new(fast(5))
            .run(|| {
                calls += 1;
                let n = calls;
                async move {
                    if n < 3 {
                        Err("flaky")
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls, 3);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_with_last_error() {
        let mut calls = 0u32;
        let result: Result<(), String> = Retry::new(fast(2))
            .run(|| {
                calls += 1;
                let n = calls;
                async move { Err(format!("attempt {n}")) }
            })
            .await;
        assert_eq!(result, Err("attempt 3".to_string()));
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_stops_immediately() {
        let mut calls = 0u32;
        let result: Result<(), &str> = Retry::new(fast(5))
            .abort_if(|e: &&str| *e == "fatal")
            .run(|| {
                calls += 1;
                async { Err("fatal") }
            })
            .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_values_are_retried_then_returned() {
        let mut calls = 0u32;
        let result: Result<u32, &str> = Retry::new(fast(2))
            .succeed_if(|v: &u32| *v == 99)
            .run(|| {
                calls += 1;
                let n = calls;
                async move { Ok(n) }
            })
            .await;
        // Never accepted, so the last attempt's value comes back.
        assert_eq!(result, Ok(3));
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn on_retry_sees_retry_number_and_error() {
        let seen: Arc<Mutex<Vec<(u32, Option<String>)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let mut calls = 0u32;
        let _: Result<u32, &str> = Retry::new(fast(3))
            .succeed_if(|v: &u32| *v >= 3)
            .on_retry(move |n, err| {
                sink.lock()
                    .unwrap()
                    .push((n, err.map(|e: &&str| e.to_string())));
            })
            .run(|| {
                calls += 1;
                let n = calls;
                async move {
                    if n == 1 {
                        Err("boom")
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![(1, Some("boom".to_string())), (2, None)]
        );
    }

    #[tokio::test]
    async fn no_retry_policy_runs_once() {
        let mut calls = 0u32;
        let result: Result<(), &str> = Retry::new(fast(0))
            .run(|| {
                calls += 1;
                async { Err("nope") }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
