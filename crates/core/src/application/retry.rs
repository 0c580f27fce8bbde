// Retry Executor - bounded retry with capped exponential backoff

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::port::GatewayError;

/// Hard cap on the inter-retry delay
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Default retry budget for remote calls
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay (1s)
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Selects which errors are worth retrying, by case-insensitive substring
/// match on the error text
#[derive(Debug, Clone)]
pub struct RetryPredicate {
    patterns: Vec<String>,
}

impl RetryPredicate {
    pub fn matching(patterns: &[&str]) -> Self {
        Self {
            patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Matches transient-class failures only. NotFound outcomes never match,
    /// so an expected "not yet provisioned" result is not retried.
    pub fn transient() -> Self {
        Self::matching(&[
            "transient",
            "timeout",
            "timed out",
            "throttl",
            "temporar",
            "connection",
            "429",
            "503",
        ])
    }

    pub fn matches(&self, error: &GatewayError) -> bool {
        let text = error.to_string().to_lowercase();
        self.patterns.iter().any(|p| text.contains(p))
    }
}

/// Retry configuration for one call site
#[derive(Debug, Clone)]
pub struct RetryOptions {
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Without a predicate every error is retried until the budget is
    /// exhausted; with one, only matching errors are retried
    pub predicate: Option<RetryPredicate>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            predicate: None,
        }
    }
}

impl RetryOptions {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            predicate: None,
        }
    }

    pub fn with_predicate(mut self, predicate: RetryPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Standard options for readiness checks: bounded retries on
    /// transient-class failures only
    pub fn transient_only(max_retries: u32, base_delay: Duration) -> Self {
        Self::new(max_retries, base_delay).with_predicate(RetryPredicate::transient())
    }
}

/// Backoff schedule: `min(base * 2^(attempt - 1), 30s)`, attempt 1-based
pub fn backoff_delay(attempt: u32, base_delay: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base_delay
        .saturating_mul(1u32 << exponent)
        .min(MAX_BACKOFF)
}

/// Execute `op`, retrying per `options`. Returns the first success or the
/// final error once the budget is exhausted or the predicate rejects.
pub async fn execute_with_retry<T, F, Fut>(
    mut op: F,
    options: &RetryOptions,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt: u32 = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let retryable = options
                    .predicate
                    .as_ref()
                    .map_or(true, |p| p.matches(&error));

                if !retryable || attempt > options.max_retries {
                    return Err(error);
                }

                let delay = backoff_delay(attempt, options.base_delay);
                warn!(
                    attempt = %attempt,
                    max_retries = %options.max_retries,
                    delay_ms = %delay.as_millis(),
                    error = %error,
                    "Retrying after failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_schedule_doubles_and_caps() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(1, base), Duration::from_secs(1));
        assert_eq!(backoff_delay(2, base), Duration::from_secs(2));
        assert_eq!(backoff_delay(3, base), Duration::from_secs(4));
        assert_eq!(backoff_delay(5, base), Duration::from_secs(16));
        // Capped at 30s from attempt 6 onward
        assert_eq!(backoff_delay(6, base), Duration::from_secs(30));
        assert_eq!(backoff_delay(12, base), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let options = RetryOptions::new(3, Duration::from_millis(1));

        let result = execute_with_retry(
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(GatewayError::Transient("throttled".into()))
                    } else {
                        Ok(42)
                    }
                }
            },
            &options,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_budget_and_returns_final_error() {
        let attempts = AtomicU32::new(0);
        let options = RetryOptions::new(2, Duration::from_millis(1));

        let result: Result<(), _> = execute_with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::Transient("still down".into())) }
            },
            &options,
        )
        .await;

        assert!(result.is_err());
        // 1 initial attempt + 2 retries
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_predicate_blocks_non_matching_errors() {
        let attempts = AtomicU32::new(0);
        let options = RetryOptions::transient_only(3, Duration::from_millis(1));

        let result: Result<(), _> = execute_with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::NotFound("mailbox missing".into())) }
            },
            &options,
        )
        .await;

        assert!(result.unwrap_err().is_not_found());
        // NotFound is not retried
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
