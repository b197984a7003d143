//! Repeated invocation of an action until a predicate holds.
//!
//! The loop runs the action, stops as soon as the result satisfies the
//! predicate, and otherwise asks the [`Schedule`] whether (and after how long)
//! to try again. A raised error never satisfies the predicate, which is not
//! even called for it, but the schedule is still consulted.

use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::cancel::{CancelReason, CancelSignal};
use crate::error::{BoxError, StepError};
use crate::schedule::{AttemptOutcome, Schedule};

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStatus {
    /// The predicate held for the last result.
    Satisfied,
    /// The schedule stopped the loop first. Not a failure by itself.
    Exhausted,
}

/// Result of a repeated invocation.
#[derive(Debug, Clone)]
pub struct RetryReport<B> {
    /// Number of attempts made.
    pub attempts: u32,
    /// Delays waited, one per retry.
    pub waited: Vec<Duration>,
    /// How the loop ended.
    pub status: RetryStatus,
    /// The last observed result.
    pub last: Result<B, StepError>,
}

impl<B> RetryReport<B> {
    /// Returns `true` if the predicate was satisfied.
    pub fn is_satisfied(&self) -> bool {
        self.status == RetryStatus::Satisfied
    }

    /// Total time spent waiting between attempts.
    pub fn total_wait(&self) -> Duration {
        self.waited.iter().sum()
    }

    /// Consume the report, returning the last observed result.
    pub fn into_result(self) -> Result<B, StepError> {
        self.last
    }
}

/// Invoke `act` on clones of `input` until `until` holds or `schedule` stops.
///
/// # Example
///
/// ```ignore
/// let report = repeat_until(
///     url,
///     |url| client.get(url),
///     &(Schedule::spaced(Duration::from_millis(10)) & Schedule::recurs(4)),
///     |status| *status == 200,
/// )
/// .await;
/// ```
pub async fn repeat_until<A, B, E, F, Fut, P>(
    input: A,
    act: F,
    schedule: &Schedule,
    until: P,
) -> RetryReport<B>
where
    A: Clone,
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<B, E>>,
    E: Into<BoxError>,
    P: Fn(&B) -> bool,
{
    drive(
        input,
        |a| act(a).map(|result| result.map_err(StepError::new)),
        schedule,
        until,
    )
    .await
}

/// Like [`repeat_until`], but aborts promptly (even mid-delay) when `cancel` fires.
pub async fn repeat_until_cancelled<A, B, E, F, Fut, P>(
    input: A,
    act: F,
    schedule: &Schedule,
    until: P,
    cancel: &CancelSignal,
) -> Result<RetryReport<B>, CancelReason>
where
    A: Clone,
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<B, E>>,
    E: Into<BoxError>,
    P: Fn(&B) -> bool,
{
    tokio::select! {
        biased;
        reason = cancel.cancelled() => Err(reason),
        report = repeat_until(input, act, schedule, until) => Ok(report),
    }
}

pub(crate) async fn drive<A, B, F, Fut, P>(
    input: A,
    act: F,
    schedule: &Schedule,
    until: P,
) -> RetryReport<B>
where
    A: Clone,
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<B, StepError>>,
    P: Fn(&B) -> bool,
{
    let mut attempt: u32 = 1;
    let mut waited = Vec::new();

    loop {
        #[cfg(feature = "tracing")]
        tracing::debug!(attempt, "retry.attempt");

        let result = act(input.clone()).await;

        let satisfied = matches!(&result, Ok(value) if until(value));
        if satisfied {
            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, "retry.satisfied");

            return RetryReport {
                attempts: attempt,
                waited,
                status: RetryStatus::Satisfied,
                last: result,
            };
        }

        let outcome = if result.is_ok() {
            AttemptOutcome::Value
        } else {
            AttemptOutcome::Error
        };
        let decision = schedule.decide(attempt, outcome);

        if !decision.proceed {
            #[cfg(feature = "tracing")]
            tracing::warn!(attempt, ?outcome, "retry.exhausted");

            return RetryReport {
                attempts: attempt,
                waited,
                status: RetryStatus::Exhausted,
                last: result,
            };
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(attempt, delay_ms = decision.delay.as_millis() as u64, "retry.wait");

        if !decision.delay.is_zero() {
            tokio::time::sleep(decision.delay).await;
        }
        waited.push(decision.delay);
        attempt = attempt.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn satisfied_on_first_attempt_never_waits() {
        let report = repeat_until(
            2,
            |x: i32| async move { Ok::<_, StepError>(x * 2) },
            &Schedule::spaced(Duration::from_secs(1)),
            |v| *v == 4,
        )
        .await;

        assert!(report.is_satisfied());
        assert_eq!(report.attempts, 1);
        assert!(report.waited.is_empty());
        assert_eq!(report.into_result().ok(), Some(4));
    }

    #[tokio::test]
    async fn recurs_zero_makes_exactly_one_attempt() {
        let calls = AtomicU32::new(0);
        let report = repeat_until(
            (),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, StepError>("PENDING") }
            },
            &Schedule::recurs(0),
            |s| *s == "OK",
        )
        .await;

        assert_eq!(report.status, RetryStatus::Exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.last.ok(), Some("PENDING"));
    }

    #[tokio::test]
    async fn predicate_is_not_called_for_errors() {
        let checked = AtomicU32::new(0);
        let report = repeat_until(
            (),
            |_| async { Err::<u8, _>(StepError::new("down")) },
            &Schedule::recurs(2),
            |_| {
                checked.fetch_add(1, Ordering::SeqCst);
                true
            },
        )
        .await;

        assert_eq!(checked.load(Ordering::SeqCst), 0);
        assert_eq!(report.attempts, 3);
        assert_eq!(report.status, RetryStatus::Exhausted);
        assert!(report.last.is_err());
    }
}
