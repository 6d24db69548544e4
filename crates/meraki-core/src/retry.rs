// ── Retry policy ──
//
// Exponential backoff for Dashboard calls. Authentication failures are
// final; only transient errors (connection, timeout, 429, 5xx) are retried.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use strum::{Display as StrumDisplay, EnumIter};
use tracing::{debug, info, warn};

use crate::error::CoreError;

/// What the retry loop needs to know about an error.
pub trait RetryableError: Display {
    fn is_auth_failure(&self) -> bool;
    fn is_transient(&self) -> bool;
    /// Server-requested wait, for rate limiting.
    fn retry_after(&self) -> Option<Duration>;
}

impl RetryableError for meraki_api::Error {
    fn is_auth_failure(&self) -> bool {
        meraki_api::Error::is_auth_failure(self)
    }

    fn is_transient(&self) -> bool {
        meraki_api::Error::is_transient(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        meraki_api::Error::retry_after(self).map(Duration::from_secs)
    }
}

impl RetryableError for CoreError {
    fn is_auth_failure(&self) -> bool {
        CoreError::is_auth_failure(self)
    }

    fn is_transient(&self) -> bool {
        CoreError::is_transient(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        CoreError::retry_after(self).map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_factor: f64,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryStrategy::Default.config()
    }
}

impl RetryConfig {
    /// Wait before retry number `attempt + 1` (attempts count from zero).
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(wait) = retry_after {
            return wait.min(self.max_delay);
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

/// Named presets, one per kind of call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, StrumDisplay, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum RetryStrategy {
    /// Initial connection: patient.
    Setup,
    Discovery,
    /// Sensor polling: give up fast, the next tick retries anyway.
    Realtime,
    Static,
    Config,
    #[default]
    Default,
}

impl RetryStrategy {
    pub fn config(self) -> RetryConfig {
        let (max_attempts, backoff_factor, base_ms, max_ms) = match self {
            Self::Setup => (5, 2.0, 2_000, 120_000),
            Self::Discovery => (3, 1.5, 1_000, 30_000),
            Self::Realtime => (2, 1.2, 500, 5_000),
            Self::Static | Self::Default => (3, 1.5, 1_000, 60_000),
            Self::Config => (2, 1.0, 500, 2_000),
        };
        RetryConfig {
            max_attempts,
            backoff_factor,
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(max_ms),
        }
    }
}

/// Run `op` until it succeeds, fails for good, or runs out of attempts.
pub async fn retry<T, E, F, Fut>(config: RetryConfig, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(
                        operation = label,
                        attempts = attempt + 1,
                        "succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                let last = attempt + 1 >= attempts;
                if last || e.is_auth_failure() || !e.is_transient() {
                    if attempt > 0 || last {
                        warn!(operation = label, attempts = attempt + 1, error = %e, "giving up");
                    }
                    return Err(e);
                }

                let delay = config.delay_for(attempt, e.retry_after());
                debug!(
                    operation = label,
                    attempt = attempt + 1,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// [`retry`] with a named preset.
pub async fn retry_with<T, E, F, Fut>(strategy: RetryStrategy, label: &str, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError,
{
    retry(strategy.config(), label, op).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn delays_grow_and_cap() {
        let cfg = RetryStrategy::Setup.config();
        assert_eq!(cfg.delay_for(0, None), Duration::from_secs(2));
        assert_eq!(cfg.delay_for(1, None), Duration::from_secs(4));
        assert_eq!(cfg.delay_for(10, None), Duration::from_secs(120));
        assert_eq!(
            cfg.delay_for(0, Some(Duration::from_secs(600))),
            Duration::from_secs(120)
        );
        assert_eq!(
            RetryStrategy::Config.config().delay_for(3, None),
            Duration::from_millis(500)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();
        let result: Result<u32, CoreError> = retry_with(RetryStrategy::Discovery, "test", || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CoreError::ConnectionFailed {
                        reason: "reset".into(),
                    })
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s + 1.5s
        assert_eq!(started.elapsed(), Duration::from_millis(2_500));
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failures_are_final() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), CoreError> = retry_with(RetryStrategy::Setup, "test", || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::AuthenticationFailed {
                    message: "Invalid API key".into(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_waits_for_retry_after() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();
        let result: Result<(), CoreError> = retry_with(RetryStrategy::Realtime, "test", || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::RateLimited {
                    retry_after_secs: 3,
                })
            }
        })
        .await;
        assert!(matches!(result, Err(CoreError::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }
}
