//! Retry policy with exponential backoff.
//!
//! A `RetryConfig` is built per client from configuration; the call site
//! only supplies the operation. Errors opt in by implementing
//! [`RetryableError`].

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Retry policy: how many times, how long to wait, and on which statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (total attempts = max_retries + 1)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Multiplier applied to the delay after every retry
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,

    /// HTTP statuses treated as transient
    #[serde(default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> u32 {
    2
}

fn default_retryable_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_factor: default_backoff_factor(),
            retryable_statuses: default_retryable_statuses(),
        }
    }
}

impl RetryConfig {
    /// Single attempt, never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 0,
            backoff_factor: 1,
            retryable_statuses: Vec::new(),
        }
    }

    /// Delay before retry number `retry` (1-based): 1s, 2s, 4s with defaults.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = u64::from(self.backoff_factor).saturating_pow(retry - 1);
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }

    /// Whether `err` is transient under this policy.
    pub fn should_retry<E: RetryableError>(&self, err: &E) -> bool {
        if err.is_connection_error() {
            return true;
        }
        err.status_code()
            .is_some_and(|status| self.retryable_statuses.contains(&status))
    }
}

/// Errors that can tell the retry loop whether they are transient.
pub trait RetryableError {
    /// HTTP status carried by the error, if any
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// Connection-level failure (DNS, refused, reset)
    fn is_connection_error(&self) -> bool {
        false
    }
}

/// Run `operation`, retrying transient failures according to `config`.
pub async fn retry<T, E, F, Fut>(config: &RetryConfig, label: &str, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Display,
{
    retry_with_check(config, label, operation, |err| config.should_retry(err)).await
}

/// Like [`retry`], with a caller-supplied transient check.
pub async fn retry_with_check<T, E, F, Fut, C>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
    is_transient: C,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut retry_no = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if retry_no >= config.max_retries || !is_transient(&err) {
                    return Err(err);
                }
                retry_no += 1;
                let delay = config.delay_for_retry(retry_no);
                tracing::warn!(
                    "{}: transient failure ({}), retry {}/{} in {:?}",
                    label,
                    err,
                    retry_no,
                    config.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum FakeError {
        Status(u16),
        Refused,
        Fatal,
    }

    impl std::fmt::Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl RetryableError for FakeError {
        fn status_code(&self) -> Option<u16> {
            match self {
                FakeError::Status(s) => Some(*s),
                _ => None,
            }
        }

        fn is_connection_error(&self) -> bool {
            matches!(self, FakeError::Refused)
        }
    }

    fn fast() -> RetryConfig {
        RetryConfig {
            initial_backoff_ms: 1,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn test_default_backoff_schedule() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_retry(0), Duration::ZERO);
        assert_eq!(config.delay_for_retry(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_retry(2), Duration::from_secs(2));
        assert_eq!(config.delay_for_retry(3), Duration::from_secs(4));
    }

    #[test]
    fn test_should_retry_classification() {
        let config = RetryConfig::default();
        assert!(config.should_retry(&FakeError::Status(429)));
        assert!(config.should_retry(&FakeError::Status(503)));
        assert!(!config.should_retry(&FakeError::Status(400)));
        assert!(!config.should_retry(&FakeError::Status(501)));
        assert!(config.should_retry(&FakeError::Refused));
        assert!(!config.should_retry(&FakeError::Fatal));
    }

    #[tokio::test]
    async fn test_retry_exhausts_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), FakeError> = retry(&fast(), "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Status(500))
            }
        })
        .await;

        assert!(matches!(result, Err(FakeError::Status(500))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_stops_on_fatal() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), FakeError> = retry(&fast(), "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Fatal)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<u32, FakeError> = retry(&fast(), "test", || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err(FakeError::Refused) } else { Ok(n) }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let _: Result<(), FakeError> = retry(&RetryConfig::none(), "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Refused)
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
