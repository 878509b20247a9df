//! Bounded retry for calls whose output has to pass validation.

use crate::error::{GenerationError, RetryError};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Pause between attempts; zero retries immediately.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: Duration::ZERO,
        }
    }
}

/// Calls `call` until `validate` accepts its output, at most
/// `policy.max_attempts` times and at least once.
///
/// Transport failures and rejected output are retried.
/// [`GenerationError::Ineligible`] ends the loop at once, as does cancelling
/// `cancel`, including while a call or the backoff is in flight.
pub async fn retry_until_valid<T, E, F, Fut, V>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut call: F,
    mut validate: V,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<String, GenerationError>>,
    V: FnMut(&str) -> Result<T, E>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last = String::from("no attempt made");

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled { attempts: attempt - 1 });
        }
        // A call that has already completed wins over a concurrent cancel.
        let outcome = tokio::select! {
            biased;
            outcome = call(attempt) => outcome,
            () = cancel.cancelled() => {
                return Err(RetryError::Cancelled { attempts: attempt - 1 });
            }
        };

        match outcome {
            Ok(text) => match validate(&text) {
                Ok(value) => {
                    tracing::debug!(attempt, "Accepted response");
                    return Ok(value);
                }
                Err(error) => {
                    tracing::warn!(attempt, %error, "Rejected malformed response");
                    last = error.to_string();
                }
            },
            Err(GenerationError::Ineligible(reason)) => {
                tracing::info!(attempt, %reason, "Request refused, not retrying");
                return Err(RetryError::Rejected(reason));
            }
            Err(error) => {
                tracing::warn!(attempt, %error, "Attempt failed");
                last = error.to_string();
            }
        }

        if attempt < max_attempts && !policy.backoff.is_zero() {
            tokio::select! {
                () = cancel.cancelled() => {
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                () = tokio::time::sleep(policy.backoff) => {}
            }
        }
    }

    Err(RetryError::Exhausted {
        attempts: max_attempts,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn parse_number(text: &str) -> Result<u32, std::num::ParseIntError> {
        text.parse()
    }

    #[tokio::test]
    async fn returns_first_valid_response() {
        let calls = Cell::new(0);
        let result = retry_until_valid(
            RetryPolicy::default(),
            &CancellationToken::new(),
            |attempt| {
                calls.set(attempt);
                async move {
                    if attempt < 3 {
                        Ok("not json".to_string())
                    } else {
                        Ok("42".to_string())
                    }
                }
            },
            parse_number,
        )
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result = retry_until_valid(
            RetryPolicy::default(),
            &CancellationToken::new(),
            |attempt| {
                calls.set(attempt);
                async { Err::<String, _>(GenerationError::Transport("503".to_string())) }
            },
            parse_number,
        )
        .await;

        assert_eq!(calls.get(), 10);
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 10, .. })));
    }

    #[tokio::test]
    async fn zero_attempt_policy_still_calls_once() {
        let calls = Cell::new(0);
        let policy = RetryPolicy {
            max_attempts: 0,
            backoff: Duration::ZERO,
        };
        let result = retry_until_valid(
            policy,
            &CancellationToken::new(),
            |attempt| {
                calls.set(attempt);
                async { Ok::<_, GenerationError>("42".to_string()) }
            },
            parse_number,
        )
        .await;

        assert_eq!(calls.get(), 1);
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn ineligible_is_never_retried() {
        let calls = Cell::new(0);
        let result = retry_until_valid(
            RetryPolicy::default(),
            &CancellationToken::new(),
            |attempt| {
                calls.set(attempt);
                async { Err::<String, _>(GenerationError::Ineligible("passing".to_string())) }
            },
            parse_number,
        )
        .await;

        assert_eq!(calls.get(), 1);
        assert_eq!(result, Err(RetryError::Rejected("passing".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_further_attempts() {
        let cancel = CancellationToken::new();
        let calls = Cell::new(0);
        let policy = RetryPolicy {
            max_attempts: 10,
            backoff: Duration::from_secs(1),
        };

        let result = retry_until_valid(
            policy,
            &cancel,
            |attempt| {
                calls.set(attempt);
                if attempt == 2 {
                    cancel.cancel();
                }
                async { Ok("garbage".to_string()) }
            },
            parse_number,
        )
        .await;

        assert_eq!(calls.get(), 2);
        assert_eq!(result, Err(RetryError::Cancelled { attempts: 2 }));
    }
}
