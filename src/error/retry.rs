use std::time::Duration;
use tokio::time::sleep;
use rand::Rng;
use tracing::{warn, debug, error};
use crate::error::FetchError;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts including the first one (default: 3)
    pub max_attempts: u32,
    /// Base delay for exponential backoff in milliseconds (default: 500ms)
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds (default: 8000ms)
    pub max_delay_ms: u64,
    /// Jitter factor to prevent thundering herd (0.0 to 1.0, default: 0.2)
    pub jitter_factor: f64,
    /// Exponential backoff multiplier (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::for_external_api()
    }
}

impl RetryConfig {
    /// Retry policy for the transaction data provider
    pub fn for_external_api() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8000,
            jitter_factor: 0.2,
            backoff_multiplier: 2.0,
        }
    }

    /// No waiting between attempts; used by tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_factor: 0.0,
            backoff_multiplier: 1.0,
        }
    }
}

/// Transient provider failures are worth another attempt; a malformed body or
/// an outright rejection will not change on retry.
pub fn is_retryable_error(error: &FetchError) -> bool {
    match error {
        FetchError::ProviderUnavailable(_) | FetchError::RateLimited(_) => true,
        FetchError::MalformedResponse(_) | FetchError::Rejected(_) => false,
    }
}

/// Calculate the delay for the next retry attempt with exponential backoff and jitter
fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let exponential_delay = config.base_delay_ms as f64
        * config.backoff_multiplier.powi(attempt as i32);

    let capped_delay = exponential_delay.min(config.max_delay_ms as f64);

    let jitter_range = capped_delay * config.jitter_factor;
    let jitter = if jitter_range > 0.0 {
        rand::thread_rng().gen_range(-jitter_range..=jitter_range)
    } else {
        0.0
    };
    let final_delay = (capped_delay + jitter).max(0.0) as u64;

    Duration::from_millis(final_delay)
}

/// Execute a future with exponential backoff retry logic
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, FetchError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 0..max_attempts {
        debug!(
            operation = operation_name,
            attempt = attempt + 1,
            max_attempts,
            "Executing provider call"
        );

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "Provider call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !is_retryable_error(&err) {
                    warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        error = %err,
                        "Provider call failed with non-retryable error"
                    );
                    return Err(err);
                }

                if attempt == max_attempts - 1 {
                    error!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        max_attempts,
                        error = %err,
                        "Provider call failed after all retry attempts"
                    );
                    last_error = Some(err);
                    break;
                }

                let delay = calculate_delay(attempt, config);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Provider call failed, retrying after delay"
                );
                last_error = Some(err);

                sleep(delay).await;
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        FetchError::ProviderUnavailable("retry loop ended without an attempt".to_string())
    }))
}
