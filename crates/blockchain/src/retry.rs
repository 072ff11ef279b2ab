use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry configuration with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (typically 2.0)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// No retries; the operation runs exactly once
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_delay.as_millis() as f64)
            * self.backoff_multiplier.powi(attempt as i32);

        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

/// Execute an operation with retry logic and exponential backoff.
///
/// Every error is retried until `max_attempts` is exhausted.
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation_name: &str,
    config: &RetryConfig,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_backoff_if(operation_name, config, operation, |_| true).await
}

/// Execute an operation with exponential backoff, retrying only errors for
/// which `should_retry` returns true. Other errors are returned immediately.
pub async fn retry_with_backoff_if<F, Fut, T, E, P>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        debug!(
            "Executing '{}' - attempt {}/{}",
            operation_name,
            attempt + 1,
            max_attempts
        );

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "'{}' succeeded on attempt {}/{}",
                        operation_name,
                        attempt + 1,
                        max_attempts
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                let last_attempt = attempt + 1 >= max_attempts;
                if last_attempt || !should_retry(&e) {
                    if !last_attempt {
                        debug!("'{}' failed with non-retryable error: {}", operation_name, e);
                    }
                    return Err(e);
                }

                warn!(
                    "'{}' failed on attempt {}/{}: {}",
                    operation_name,
                    attempt + 1,
                    max_attempts,
                    e
                );

                let delay = config.calculate_delay(attempt);
                debug!("Retrying '{}' after {:?}", operation_name, delay);
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
