//! Retry with backoff for fallible async operations.
//!
//! Used for both backend selection (waiting for a model to become
//! available) and completion requests.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;

/// Configured attempt counts are clamped to this range.
pub const ATTEMPT_BOUNDS: (u32, u32) = (3, 5);

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `initial * 2^n`
    Exponential,
    /// `initial * (n + 1)`
    Linear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub schedule: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        let (min, max) = ATTEMPT_BOUNDS;
        let max_attempts = config.max_attempts.clamp(min, max);
        if max_attempts != config.max_attempts {
            tracing::warn!(
                configured = config.max_attempts,
                used = max_attempts,
                "retry.max_attempts out of range, clamping"
            );
        }
        Self {
            max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            schedule: Backoff::Exponential,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            schedule: Backoff::Exponential,
        }
    }

    /// Delay after the failed attempt with 0-based index `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let delay = match self.schedule {
            Backoff::Exponential => self
                .initial_backoff
                .saturating_mul(2u32.saturating_pow(attempt)),
            Backoff::Linear => self.initial_backoff.saturating_mul(attempt.saturating_add(1)),
        };
        delay.min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// runs out of attempts. The last error is returned unchanged.
    ///
    /// `op` receives the 0-based attempt index.
    pub async fn run<T, E, F, Fut, P>(&self, label: &str, mut op: F, retryable: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < attempts && retryable(&e) => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        operation = label,
                        attempt = attempt + 1,
                        max = attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(schedule: Backoff) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            schedule,
        }
    }

    #[test]
    fn configured_attempts_are_clamped() {
        let attempts = |n| {
            RetryPolicy::from(&RetryConfig {
                max_attempts: n,
                ..RetryConfig::default()
            })
            .max_attempts
        };
        assert_eq!(attempts(0), 3);
        assert_eq!(attempts(1), 3);
        assert_eq!(attempts(4), 4);
        assert_eq!(attempts(5), 5);
        assert_eq!(attempts(50), 5);
    }

    #[test]
    fn backoff_is_exponential() {
        let p = policy(Backoff::Exponential);
        assert_eq!(p.backoff(0), Duration::from_secs(1));
        assert_eq!(p.backoff(1), Duration::from_secs(2));
        assert_eq!(p.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn backoff_is_linear() {
        let p = policy(Backoff::Linear);
        assert_eq!(p.backoff(0), Duration::from_secs(1));
        assert_eq!(p.backoff(2), Duration::from_secs(3));
    }

    #[test]
    fn backoff_capped_at_max() {
        assert_eq!(policy(Backoff::Exponential).backoff(10), Duration::from_secs(30));
        assert_eq!(policy(Backoff::Exponential).backoff(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn default_matches_retry_config() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 4);
        assert_eq!(p.initial_backoff, Duration::from_secs(1));
        assert_eq!(p.max_backoff, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = RetryPolicy::immediate(4)
            .run(
                "test",
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt < 2 {
                            Err("503".to_string())
                        } else {
                            Ok(attempt)
                        }
                    }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = RetryPolicy::immediate(3)
            .run(
                "test",
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Err(format!("failure {attempt}")) }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Err("failure 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = RetryPolicy::immediate(5)
            .run(
                "test",
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("401 Unauthorized".to_string()) }
                },
                |e| !e.contains("401"),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let _: Result<(), String> = RetryPolicy::immediate(0)
            .run(
                "test",
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("x".to_string()) }
                },
                |_| true,
            )
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
