//! Retry policy for rate-limited remote calls.
//!
//! # Policy
//!
//! - Max attempts: 3 (initial call + 2 retries)
//! - Delay before retry `n` (0-based attempt that failed): `base * 2^n + jitter`
//! - Base: 1 second
//! - Jitter: uniform in `[0, 1s)`, added on top (never shortens the wait)
//! - A server `Retry-After` longer than the computed delay wins
//!
//! Only [`RemoteError::RateLimited`] is retried. Any other error is returned
//! immediately; after the last attempt the final error is returned as-is.

use std::future::Future;
use std::time::Duration;

use crate::RemoteError;

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first call. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Delay unit that is doubled per attempt.
    pub base_delay: Duration,
    /// Upper bound (exclusive) of the random delay added to each wait.
    pub max_jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_secs(1),
        }
    }
}

/// Something that can wait. Injected so backoff can be observed in tests.
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Real sleeping via the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Exponential delay for the retry that follows failed `attempt` (0-based), without jitter.
#[must_use]
pub fn backoff_floor(attempt: u32, config: &RetryConfig) -> Duration {
    2_u32
        .checked_pow(attempt)
        .and_then(|factor| config.base_delay.checked_mul(factor))
        .unwrap_or(Duration::MAX)
}

/// Calculate the wait after failed `attempt` (0-based).
#[must_use]
pub fn calculate_retry_delay(
    attempt: u32,
    config: &RetryConfig,
    retry_after: Option<Duration>,
) -> Duration {
    let jitter = config.max_jitter.mul_f64(rand::random::<f64>());
    let delay = backoff_floor(attempt, config).saturating_add(jitter);
    match retry_after {
        Some(server) if server > delay => server,
        _ => delay,
    }
}

/// Run `operation` until it succeeds, fails with a non rate-limit error, or
/// runs out of attempts.
///
/// `operation` receives the 0-based attempt number.
pub async fn call_with_retry<T, F, Fut, S>(
    mut operation: F,
    config: &RetryConfig,
    sleeper: &S,
) -> Result<T, RemoteError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
    S: Sleeper,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limited() && attempt + 1 < max_attempts => {
                let delay = calculate_retry_delay(attempt, config, err.retry_after());
                tracing::debug!(
                    error = %err,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited; retrying"
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_rate_limited() {
                    tracing::warn!(attempts = attempt + 1, "Rate limit retries exhausted");
                }
                return Err(err);
            }
        }
    }
}
