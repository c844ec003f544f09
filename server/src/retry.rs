use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::climate::ProviderError;

pub struct RetryPolicy {
    /// Total attempt budget, first call included.
    pub max_attempts: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Maximum jitter as a fraction of the delay (0.25 = ±25%).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            jitter_factor: 0.25,
        }
    }
}

/// Run `func` with bounded retries.
///
/// Only `ProviderError::RateLimited` is retried; `Terminal` and `Transport`
/// failures return immediately since retrying a non-transient rejection
/// buys nothing. After the attempt budget is exhausted the last error is
/// returned as-is.
pub async fn with_backoff<F, Fut, T>(func: F, policy: &RetryPolicy) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        match func().await {
            Ok(result) => return Ok(result),
            Err(ProviderError::RateLimited) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(ProviderError::RateLimited);
                }
                let delay = backoff_with_jitter(attempt - 1, policy);
                log::warn!(
                    "Rate limited, retry {}/{} after {:?}",
                    attempt,
                    policy.max_attempts - 1,
                    delay
                );
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Exponential backoff (`base * 2^attempt`) with random jitter to avoid
/// synchronized retries.
fn backoff_with_jitter(attempt: u32, policy: &RetryPolicy) -> Duration {
    let base_ms = policy.base_delay.as_millis() as u64 * 2u64.pow(attempt);
    let jitter_range = (base_ms as f64 * policy.jitter_factor) as u64;
    let jitter = rand::rng().random_range(0..=jitter_range * 2) as i64 - jitter_range as i64;
    let delay_ms = (base_ms as i64 + jitter).max(0) as u64;
    Duration::from_millis(delay_ms)
}
