//! Error types raised while building and running scenarios.
//!
//! - [`StepError`]: what a caller closure raised (an error value or a panic)
//! - [`Failure`]: why a run did not pass
//! - [`ScenarioError`]: a whole failed run, for adapters that report failures by `Err`

use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

use crate::execution::{Diagnostic, Outcome};

/// Boxed error accepted from caller closures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// An error raised by an arrange step, an act step or a sequenced constituent.
///
/// Caller errors are stored behind `Arc` so diagnostics can be cloned freely.
#[derive(thiserror::Error, Debug, Clone)]
pub enum StepError {
    /// The closure returned an error.
    #[error("{0}")]
    Raised(Arc<dyn StdError + Send + Sync + 'static>),

    /// The closure panicked.
    #[error("panicked: {0}")]
    Panicked(Arc<str>),

    /// A constituent of a sequenced scenario failed.
    #[error("constituent #{index}{} failed: {source}", label_suffix(.label))]
    Constituent {
        /// Position of the constituent in the sequenced input.
        index: usize,
        /// Label of the constituent, if it had one.
        label: Option<Arc<str>>,
        /// The constituent's own error.
        source: Box<StepError>,
    },
}

fn label_suffix(label: &Option<Arc<str>>) -> String {
    match label {
        Some(label) => format!(" ({label})"),
        None => String::new(),
    }
}

impl StepError {
    /// Wrap any caller error.
    ///
    /// A `StepError` passed back in is returned as is instead of being nested.
    pub fn new(err: impl Into<BoxError>) -> Self {
        match err.into().downcast::<StepError>() {
            Ok(step) => *step,
            Err(other) => Self::Raised(Arc::from(other)),
        }
    }

    /// Build from a panic payload captured by `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message: Arc<str> = if let Some(s) = payload.downcast_ref::<&str>() {
            Arc::from(*s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Arc::from(s.as_str())
        } else {
            Arc::from("non-string panic payload")
        };
        Self::Panicked(message)
    }

    /// Tag this error with the position (and label) of the constituent that raised it.
    pub fn in_constituent(self, index: usize, label: Option<Arc<str>>) -> Self {
        Self::Constituent {
            index,
            label,
            source: Box::new(self),
        }
    }

    /// Returns `true` if the closure panicked rather than returning an error.
    pub fn is_panic(&self) -> bool {
        match self {
            Self::Panicked(_) => true,
            Self::Raised(_) => false,
            Self::Constituent { source, .. } => source.is_panic(),
        }
    }

    /// Index of the failing constituent, for errors raised inside a sequence.
    pub fn constituent_index(&self) -> Option<usize> {
        match self {
            Self::Constituent { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Downcast the innermost raised error to a concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Raised(err) => err.downcast_ref::<E>(),
            Self::Panicked(_) => None,
            Self::Constituent { source, .. } => source.downcast_ref::<E>(),
        }
    }
}

/// Why a scenario run failed.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Failure {
    /// The value producer raised; the action never ran.
    #[error("arrange step failed: {0}")]
    Arrange(StepError),

    /// The action raised and no failure was expected.
    #[error("act step failed: {0}")]
    Act(StepError),

    /// An assertion rejected the acted value.
    #[error("assertion `{description}` failed: {reason}")]
    Assertion {
        /// Description of the rejecting assertion.
        description: Arc<str>,
        /// What the assertion reported.
        reason: Arc<str>,
    },

    /// The action raised as expected, but the error did not match the expectation.
    #[error("act step raised an unexpected error: {0}")]
    UnmatchedError(StepError),
}

/// A failed run, carrying everything needed to report it.
#[derive(thiserror::Error, Debug, Clone)]
#[error("scenario{} {outcome}{diagnostic}", quoted_label(.label))]
pub struct ScenarioError {
    /// Label of the scenario, if any.
    pub label: Option<Arc<str>>,
    /// The non-passing outcome.
    pub outcome: Outcome,
    /// Values observed during the run.
    pub diagnostic: Diagnostic,
}

fn quoted_label(label: &Option<Arc<str>>) -> String {
    match label {
        Some(label) => format!(" `{label}`"),
        None => String::new(),
    }
}
