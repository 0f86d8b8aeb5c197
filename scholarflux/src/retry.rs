//! Retry state machine: executes a request callable, validates the result,
//! and backs off between attempts.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::error::RetryError;
use crate::validator::{Classification, ResponseValidator};

/// Backoff and attempt-limit configuration.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    /// Upper bound of the random jitter added to each backoff sleep.
    pub jitter: Duration,
    /// Whether a `Retry-After` hint is honored once without counting
    /// against `max_attempts`.
    pub honor_retry_after: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(100),
            backoff_cap: Duration::from_secs(10),
            jitter: Duration::from_millis(50),
            honor_retry_after: true,
        }
    }
}

impl RetryConfig {
    /// `min(cap, base * 2^(attempt-1)) + jitter`, `attempt` being 1-indexed.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exp = 2u32.saturating_pow(attempt.saturating_sub(1));
        let scaled = self.backoff_base.saturating_mul(exp);
        let base = scaled.min(self.backoff_cap);
        let jitter_ms = if self.jitter.is_zero() {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64)
        };
        base + Duration::from_millis(jitter_ms)
    }
}

/// Outcome of one [`RetryHandler::execute`] call.
pub struct Outcome<R> {
    pub response: R,
    pub attempts: u32,
}

/// Executes a request closure, validating each attempt's status via
/// [`ResponseValidator`] and sleeping according to [`RetryConfig`] between
/// retries.
#[derive(Clone)]
pub struct RetryHandler {
    config: RetryConfig,
    validator: ResponseValidator,
}

impl RetryHandler {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            validator: ResponseValidator,
        }
    }

    /// `request_fn` is invoked once per attempt and must return the response
    /// status plus an opaque `retry_after` hint (seconds) when present, and
    /// the response/error value itself. `request_fn` takes the 1-indexed
    /// attempt number so callers can log or vary behavior per attempt.
    pub async fn execute<R, E, F, Fut>(
        &self,
        cancel: &CancelToken,
        mut request_fn: F,
    ) -> Result<Outcome<R>, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(u16, Option<Duration>, R), E>>,
        E: Into<RetryError>,
    {
        let mut attempts = 0u32;
        let mut honored_retry_after = false;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }
            attempts += 1;

            match request_fn(attempts).await {
                Err(err) => {
                    let err: RetryError = err.into();
                    if attempts >= self.config.max_attempts {
                        warn!(attempts, "retry limit exceeded after transport error");
                        return Err(RetryError::RetryLimitExceeded {
                            max_attempts: self.config.max_attempts,
                        });
                    }
                    debug!(attempts, error = %err, "transport error, backing off");
                    self.sleep_backoff(cancel, attempts).await?;
                }
                Ok((status, retry_after, response)) => match self.validator.classify(status) {
                    Classification::Ok => {
                        return Ok(Outcome { response, attempts });
                    }
                    Classification::PermanentError => {
                        return Err(RetryError::RequestFailed { status });
                    }
                    Classification::RateLimited if self.config.honor_retry_after && !honored_retry_after => {
                        honored_retry_after = true;
                        let wait = retry_after.unwrap_or_else(|| self.config.backoff_for_attempt(attempts));
                        debug!(?wait, "honoring retry-after hint, not counting against attempts");
                        attempts -= 1;
                        self.sleep(cancel, wait).await?;
                    }
                    Classification::RateLimited | Classification::RetriableError => {
                        if attempts >= self.config.max_attempts {
                            return Err(RetryError::RetryLimitExceeded {
                                max_attempts: self.config.max_attempts,
                            });
                        }
                        self.sleep_backoff(cancel, attempts).await?;
                    }
                },
            }
        }
    }

    async fn sleep_backoff(&self, cancel: &CancelToken, attempts: u32) -> Result<(), RetryError> {
        self.sleep(cancel, self.config.backoff_for_attempt(attempts)).await
    }

    async fn sleep(&self, cancel: &CancelToken, duration: Duration) -> Result<(), RetryError> {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }
        tokio::time::sleep(duration).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_first_ok_response() {
        let handler = RetryHandler::new(RetryConfig::default());
        let cancel = CancelToken::new();
        let outcome: Outcome<&str> = handler
            .execute(&cancel, |_attempt| async { Ok::<_, RetryError>((200, None, "body")) })
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.response, "body");
    }

    #[tokio::test(start_paused = true)]
    async fn retries_on_503_then_succeeds() {
        let handler = RetryHandler::new(RetryConfig {
            max_attempts: 3,
            backoff_base: Duration::from_millis(1),
            backoff_cap: Duration::from_millis(5),
            jitter: Duration::ZERO,
            honor_retry_after: true,
        });
        let cancel = CancelToken::new();
        let counter = AtomicU32::new(0);
        let outcome: Outcome<u16> = handler
            .execute(&cancel, |_attempt| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Ok::<_, RetryError>((503, None, 503))
                    } else {
                        Ok::<_, RetryError>((200, None, 200))
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_stops_immediately() {
        let handler = RetryHandler::new(RetryConfig::default());
        let cancel = CancelToken::new();
        let result: Result<Outcome<u16>, RetryError> = handler
            .execute(&cancel, |_attempt| async { Ok::<_, RetryError>((401, None, 401)) })
            .await;
        assert!(matches!(result, Err(RetryError::RequestFailed { status: 401 })));
    }

    #[tokio::test(start_paused = true)]
    async fn exceeding_max_attempts_raises_retry_limit_exceeded() {
        let handler = RetryHandler::new(RetryConfig {
            max_attempts: 2,
            backoff_base: Duration::from_millis(1),
            backoff_cap: Duration::from_millis(2),
            jitter: Duration::ZERO,
            honor_retry_after: false,
        });
        let cancel = CancelToken::new();
        let result: Result<Outcome<u16>, RetryError> = handler
            .execute(&cancel, |_attempt| async { Ok::<_, RetryError>((503, None, 503)) })
            .await;
        assert!(matches!(result, Err(RetryError::RetryLimitExceeded { max_attempts: 2 })));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_formula_matches_exponential_cap() {
        let config = RetryConfig {
            max_attempts: 5,
            backoff_base: Duration::from_millis(100),
            backoff_cap: Duration::from_millis(300),
            jitter: Duration::ZERO,
            honor_retry_after: false,
        };
        assert_eq!(config.backoff_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for_attempt(3), Duration::from_millis(300));
        assert_eq!(config.backoff_for_attempt(4), Duration::from_millis(300));
    }
}
