//! Retry schedules for repeated invocation.
//!
//! A [`Schedule`] is a pure policy: given the 1-based index of the attempt that
//! just finished and whether it produced a value, it decides whether another
//! attempt follows and how long to wait first. Schedules compose with
//! [`Schedule::and`] (or `&`) without evaluating either side.

use std::ops::BitAnd;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What the attempt that just finished produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The action returned a value that did not satisfy the predicate.
    Value,
    /// The action raised an error.
    Error,
}

/// A schedule's verdict for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether another attempt follows.
    pub proceed: bool,
    /// How long to wait before it.
    pub delay: Duration,
}

/// Retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    /// Always proceed, waiting a fixed delay.
    Spaced(Duration),
    /// Proceed while the attempt index is at most `n`; no delay.
    Recurs(u32),
    /// Always proceed, doubling the delay each attempt starting from the base.
    Exponential(Duration),
    /// Proceed only if the attempt produced a value; errors end the loop.
    WhileOk,
    /// Proceed if both proceed, waiting the longer of the two delays.
    And(Box<Schedule>, Box<Schedule>),
}

impl Schedule {
    /// Wait `delay` between attempts, forever.
    pub const fn spaced(delay: Duration) -> Self {
        Self::Spaced(delay)
    }

    /// Allow `n` retries after the first attempt. `recurs(0)` never retries.
    pub const fn recurs(n: u32) -> Self {
        Self::Recurs(n)
    }

    /// Wait `base`, then `2 * base`, `4 * base`, ... forever.
    pub const fn exponential(base: Duration) -> Self {
        Self::Exponential(base)
    }

    /// Stop as soon as an attempt raises an error.
    pub const fn while_ok() -> Self {
        Self::WhileOk
    }

    /// Combine two schedules: both must proceed, the longer delay wins.
    pub fn and(self, other: Schedule) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Decide what follows attempt number `attempt` (1-based).
    pub fn decide(&self, attempt: u32, outcome: AttemptOutcome) -> Decision {
        match self {
            Self::Spaced(delay) => Decision {
                proceed: true,
                delay: *delay,
            },
            Self::Recurs(n) => Decision {
                proceed: attempt <= *n,
                delay: Duration::ZERO,
            },
            Self::Exponential(base) => {
                let factor = 1u32
                    .checked_shl(attempt.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                Decision {
                    proceed: true,
                    delay: base.saturating_mul(factor),
                }
            }
            Self::WhileOk => Decision {
                proceed: outcome == AttemptOutcome::Value,
                delay: Duration::ZERO,
            },
            Self::And(left, right) => {
                let left = left.decide(attempt, outcome);
                let right = right.decide(attempt, outcome);
                Decision {
                    proceed: left.proceed && right.proceed,
                    delay: left.delay.max(right.delay),
                }
            }
        }
    }

    /// Upper bound on the total number of attempts, if the schedule is finite.
    pub fn max_attempts(&self) -> Option<u32> {
        match self {
            Self::Recurs(n) => Some(n.saturating_add(1)),
            Self::And(left, right) => match (left.max_attempts(), right.max_attempts()) {
                (Some(l), Some(r)) => Some(l.min(r)),
                (Some(n), None) | (None, Some(n)) => Some(n),
                (None, None) => None,
            },
            Self::Spaced(_) | Self::Exponential(_) | Self::WhileOk => None,
        }
    }
}

impl BitAnd for Schedule {
    type Output = Schedule;

    fn bitand(self, rhs: Schedule) -> Schedule {
        self.and(rhs)
    }
}
