//! Exponential backoff retry

use std::future::Future;
use std::time::Duration;

/// Bounded retry with doubling delays: base, 2x base, 4x base, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay slept after failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exp)
    }

    /// Run `operation` until it succeeds or attempts run out.
    ///
    /// `on_attempt_failed(attempt, &err)` is called for every failed attempt
    /// that will be retried; it is not called for the final one, whose error
    /// is returned.
    pub async fn run<T, E, F, Fut>(
        &self,
        mut operation: F,
        mut on_attempt_failed: impl FnMut(u32, &E),
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts => {
                    on_attempt_failed(attempt, &err);
                    tokio::time::sleep(self.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(8000));
        // exponent is capped instead of overflowing
        assert_eq!(policy.delay_for(200), policy.delay_for(32));
        assert_eq!(
            RetryPolicy::new(5, Duration::MAX).delay_for(3),
            Duration::MAX
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_between_attempts() {
        let policy = RetryPolicy::new(4, Duration::from_millis(1000));
        let starts = Arc::new(Mutex::new(Vec::new()));

        let result: Result<(), String> = policy
            .run(
                || {
                    let starts = starts.clone();
                    async move {
                        starts.lock().unwrap().push(Instant::now());
                        Err("down".to_string())
                    }
                },
                |_, _| {},
            )
            .await;
        assert!(result.is_err());

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 4);
        let gaps: Vec<u128> = starts
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis())
            .collect();
        assert_eq!(gaps, vec![1000, 2000, 4000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let mut calls = 0;
        let mut observed = Vec::new();

        let result: Result<(), String> = policy
            .run(
                || {
                    calls += 1;
                    let n = calls;
                    async move { Err(format!("attempt {}", n)) }
                },
                |attempt, err: &String| observed.push((attempt, err.clone())),
            )
            .await;

        assert_eq!(calls, 3);
        assert_eq!(
            observed,
            vec![(1, "attempt 1".to_string()), (2, "attempt 2".to_string())]
        );
        assert_eq!(result.unwrap_err(), "attempt 3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_stops_retrying() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        let mut calls = 0;

        let result = policy
            .run(
                || {
                    calls += 1;
                    let n = calls;
                    async move {
                        if n < 2 {
                            Err("flaky")
                        } else {
                            Ok(n)
                        }
                    }
                },
                |_, _| {},
            )
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_has_no_delay() {
        let policy = RetryPolicy::new(1, Duration::from_secs(60));
        let started = Instant::now();
        let mut observed = 0;

        let result: Result<(), &str> = policy
            .run(|| async { Err("nope") }, |_, _| observed += 1)
            .await;

        assert_eq!(result, Err("nope"));
        assert_eq!(observed, 0);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_tries_once() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        let mut calls = 0;
        let result: Result<(), ()> = policy
            .run(
                || {
                    calls += 1;
                    async { Err(()) }
                },
                |_, _| {},
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
