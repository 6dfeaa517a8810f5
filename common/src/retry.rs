// Retry with exponential backoff and jitter for outbound HTTP calls

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Delay schedule between attempts
pub trait RetryStrategy: Send + Sync {
    /// Delay before retry number `attempt` (0-based); `None` once retries are exhausted
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

/// `base * 2^attempt`, capped at `max_delay`, plus up to `jitter_factor` of random extra
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    jitter_factor: f64,
    max_retries: u32,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter_factor: 0.2,
            max_retries: 2,
        }
    }
}

impl ExponentialBackoff {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_config(
        base_delay: Duration,
        max_delay: Duration,
        jitter_factor: f64,
        max_retries: u32,
    ) -> Self {
        Self {
            base_delay,
            max_delay,
            jitter_factor: jitter_factor.clamp(0.0, 1.0),
            max_retries,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn base_delay_ms(&self, attempt: u32) -> u64 {
        let base = self.base_delay.as_millis() as u64;
        let factor = 2_u64.checked_pow(attempt).unwrap_or(u64::MAX);
        base.saturating_mul(factor)
            .min(self.max_delay.as_millis() as u64)
    }

    fn with_jitter_ms(&self, delay_ms: u64) -> u64 {
        let range = (delay_ms as f64 * self.jitter_factor) as u64;
        if range == 0 {
            return delay_ms;
        }
        delay_ms + rand::thread_rng().gen_range(0..=range)
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        Some(Duration::from_millis(
            self.with_jitter_ms(self.base_delay_ms(attempt)),
        ))
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the strategy runs out of retries. The last error is returned.
pub async fn retry_async<T, E, F, Fut>(
    strategy: &dyn RetryStrategy,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) => match strategy.next_delay(attempt) {
                Some(delay) => {
                    warn!(error = %e, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "Retrying after transient failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}
