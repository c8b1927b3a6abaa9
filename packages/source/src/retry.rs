//! Retry helper for transient upstream failures.
//!
//! Only [`UpstreamError::Transient`] failures are retried. HTTP status
//! errors, configuration errors, and JSON errors are returned immediately.
//!
//! ```ignore
//! let body = retry::with_retry(&policy, country, |_attempt| client.fetch_once(country)).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::UpstreamError;

/// Default number of attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Multiplier applied to the delay after each failed attempt.
pub const DEFAULT_BACKOFF_FACTOR: u32 = 3;

/// Bounded exponential backoff.
///
/// With the defaults, attempts are separated by 500ms and then 1500ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Treated as at least 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Growth factor per attempt.
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based):
    /// `base_delay * factor^(attempt - 1)`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.base_delay
            .saturating_mul(self.factor.saturating_pow(exponent))
    }
}

/// Runs `op` until it succeeds, fails non-transiently, or the attempt
/// budget is spent.
///
/// `op` receives the 1-based attempt number. `label` identifies the
/// request in log output.
///
/// # Errors
///
/// Returns the last [`UpstreamError`] produced by `op`.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, UpstreamError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        log::debug!("Fetch attempt {attempt}/{max_attempts} for {label}");

        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        log::warn!(
            "Fetch attempt {attempt}/{max_attempts} failed for {label}: {err} (status={})",
            err.status()
                .map_or_else(|| "n/a".to_string(), |s| s.to_string())
        );

        if !err.is_transient() {
            return Err(err);
        }
        if attempt >= max_attempts {
            log::error!("Giving up on {label} after {max_attempts} attempts");
            return Err(err);
        }

        let delay = policy.delay_after(attempt);
        log::info!("Retrying {label} in {delay:?}...");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn reset() -> UpstreamError {
        UpstreamError::Transient {
            message: "connection reset by peer".to_string(),
        }
    }

    #[test]
    fn default_delays_grow_by_three() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1500));
        assert_eq!(policy.delay_after(3), Duration::from_millis(4500));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_after_backoff() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = with_retry(&RetryPolicy::default(), "Italy", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(reset())
                } else {
                    Ok(serde_json::json!([{ "country": "Italy" }]))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result[0]["country"], "Italy");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(2000), "waited {waited:?}");
        assert!(waited < Duration::from_millis(2100), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let err = with_retry(&RetryPolicy::default(), "Italy", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(reset()) }
        })
        .await
        .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), DEFAULT_MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn status_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let err = with_retry(&RetryPolicy::default(), "Italy", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(UpstreamError::Status {
                    status: 502,
                    message: "Bad Gateway".to_string(),
                })
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err.status(), Some(502));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
