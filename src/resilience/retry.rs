//! Retry policy with exponential backoff.

use super::Idempotency;
use crate::error::{ServerError, TerraError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff settings for idempotent calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Resends allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first resend.
    pub initial_backoff: Duration,
    /// Upper bound for any delay, including server hints.
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryConfig {
    /// `max_retries` resends, starting at 100ms and doubling up to 10s.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }

    /// Delay before the first resend.
    pub fn with_initial_backoff(mut self, duration: Duration) -> Self {
        self.initial_backoff = duration;
        self
    }

    /// Upper bound for any delay.
    pub fn with_max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    /// Growth factor between delays.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Delay before resend number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(retry.min(64) as i32);
        let millis = (self.initial_backoff.as_millis() as f64 * factor)
            .min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }
}

/// Runs an operation, resending idempotent ones on retryable errors.
///
/// The operation closure is called afresh for every attempt, so whatever it
/// builds (date, digest, signature) is rebuilt too.
#[derive(Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` once, then again while it fails with a retryable
    /// error and resends remain. Non-idempotent operations get no resends.
    pub async fn execute<F, Fut, T>(
        &self,
        idempotency: Idempotency,
        operation: F,
    ) -> Result<T, TerraError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, TerraError>>,
    {
        let resends = match idempotency {
            Idempotency::Idempotent => self.config.max_retries,
            Idempotency::NonIdempotent => 0,
        };

        let mut retry = 0;
        loop {
            let error = match operation().await {
                Ok(value) => {
                    if retry > 0 {
                        debug!(resends = retry, "Call succeeded after resend");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(error);
            }
            if retry >= resends {
                if resends > 0 {
                    warn!(resends = resends, error = %error, "Giving up after resends");
                }
                return Err(error);
            }

            let delay = self.delay_after(retry, &error);
            debug!(
                resend = retry + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Resending after transient failure"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }

    fn delay_after(&self, retry: u32, error: &TerraError) -> Duration {
        match error {
            TerraError::Server(ServerError::TooManyRequests {
                retry_after: Some(hint),
            }) => (*hint).min(self.config.max_backoff),
            _ => self.config.delay_for(retry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NetworkError, RemoteError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(RetryConfig::new(max_retries).with_initial_backoff(Duration::from_millis(1)))
    }

    fn connection_error() -> TerraError {
        TerraError::Network(NetworkError::ConnectionFailed {
            message: "reset".to_string(),
        })
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_multiplier, 2.0);
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::new(
            RetryConfig::new(3)
                .with_initial_backoff(Duration::from_millis(100))
                .with_multiplier(2.0),
        );

        assert_eq!(policy.config().delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.config().delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.config().delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_capped() {
        let policy = RetryPolicy::new(
            RetryConfig::new(10)
                .with_initial_backoff(Duration::from_secs(1))
                .with_max_backoff(Duration::from_secs(5))
                .with_multiplier(10.0),
        );
        assert_eq!(policy.config().delay_for(5), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_after_hint_is_capped() {
        let policy = RetryPolicy::new(RetryConfig::new(3).with_max_backoff(Duration::from_secs(2)));
        let throttled = TerraError::Server(ServerError::TooManyRequests {
            retry_after: Some(Duration::from_secs(30)),
        });
        assert_eq!(policy.delay_after(0, &throttled), Duration::from_secs(2));
        assert_eq!(
            policy.delay_after(0, &connection_error()),
            Duration::from_millis(100)
        );
    }

    #[tokio::test]
    async fn test_idempotent_retries_until_success() {
        let policy = fast_policy(3);
        let calls = AtomicU32::new(0);

        let result = policy
            .execute(Idempotency::Idempotent, || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(connection_error())
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_idempotent_gives_up_after_max_retries() {
        let policy = fast_policy(3);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute(Idempotency::Idempotent, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(connection_error())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_idempotent_sent_once() {
        let policy = fast_policy(3);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute(Idempotency::NonIdempotent, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(connection_error())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_error_not_retried() {
        let policy = fast_policy(3);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute(Idempotency::Idempotent, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TerraError::Remote(RemoteError::new(102001, "bad parameter")))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
