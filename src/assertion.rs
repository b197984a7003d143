//! Assertions attached to acted scenarios.
//!
//! Result checks see the acted value; error checks see the [`StepError`] an
//! expected-failure scenario's action raised. The assertion mode is a type
//! parameter of [`Asserted`](crate::Asserted): [`Succeeds`] or [`Fails`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;

use crate::error::StepError;

// ============================================================================
// Verdicts
// ============================================================================

/// Conversion of an assertion's return value into pass/fail.
///
/// - `bool`: `false` fails
/// - `()`: always passes (failure is signalled by panicking, e.g. `assert_eq!`)
/// - `Result<(), E>`: `Err` fails with the error's message
pub trait Verdict {
    /// `Ok(())` to pass, `Err(reason)` to fail.
    fn into_verdict(self) -> Result<(), Arc<str>>;
}

impl Verdict for bool {
    fn into_verdict(self) -> Result<(), Arc<str>> {
        if self {
            Ok(())
        } else {
            Err(Arc::from("predicate returned false"))
        }
    }
}

impl Verdict for () {
    fn into_verdict(self) -> Result<(), Arc<str>> {
        Ok(())
    }
}

impl<E: fmt::Display> Verdict for Result<(), E> {
    fn into_verdict(self) -> Result<(), Arc<str>> {
        self.map_err(|e| Arc::from(e.to_string()))
    }
}

// ============================================================================
// Checks
// ============================================================================

type CheckFn<B> = dyn Fn(&B) -> BoxFuture<'static, Result<(), Arc<str>>> + Send + Sync;

/// A described check over an acted value.
pub(crate) struct Check<B> {
    pub(crate) description: Arc<str>,
    pub(crate) eval: Arc<CheckFn<B>>,
}

impl<B> Clone for Check<B> {
    fn clone(&self) -> Self {
        Self {
            description: Arc::clone(&self.description),
            eval: Arc::clone(&self.eval),
        }
    }
}

impl<B: 'static> Check<B> {
    pub(crate) fn from_fn<F>(description: Arc<str>, eval: F) -> Self
    where
        F: Fn(&B) -> BoxFuture<'static, Result<(), Arc<str>>> + Send + Sync + 'static,
    {
        Self {
            description,
            eval: Arc::new(eval),
        }
    }

    pub(crate) fn sync<V, F>(description: Arc<str>, pred: F) -> Self
    where
        V: Verdict,
        F: Fn(&B) -> V + Send + Sync + 'static,
    {
        Self::from_fn(description, move |value: &B| {
            future::ready(pred(value).into_verdict()).boxed()
        })
    }

    /// The closure borrows the value synchronously and returns an owned future.
    pub(crate) fn future<V, F, Fut>(description: Arc<str>, check: F) -> Self
    where
        V: Verdict,
        F: Fn(&B) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        Self::from_fn(description, move |value: &B| {
            check(value).map(|verdict| verdict.into_verdict()).boxed()
        })
    }
}

/// A described predicate over the error an expected-failure scenario raised.
pub(crate) struct ErrorCheck {
    pub(crate) description: Arc<str>,
    pub(crate) eval: Arc<dyn Fn(&StepError) -> bool + Send + Sync>,
}

impl Clone for ErrorCheck {
    fn clone(&self) -> Self {
        Self {
            description: Arc::clone(&self.description),
            eval: Arc::clone(&self.eval),
        }
    }
}

impl ErrorCheck {
    pub(crate) fn new<F>(description: Arc<str>, pred: F) -> Self
    where
        F: Fn(&StepError) -> bool + Send + Sync + 'static,
    {
        Self {
            description,
            eval: Arc::new(pred),
        }
    }
}

pub(crate) fn default_description(kind: &str, index: usize) -> Arc<str> {
    Arc::from(format!("{kind} #{}", index + 1))
}

// ============================================================================
// Assertion modes
// ============================================================================

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Succeeds {}
    impl Sealed for super::Fails {}
}

/// Marker trait for assertion modes.
pub trait AssertionMode: sealed::Sealed + Send + Sync + 'static {
    /// Whether the action is expected to raise.
    const EXPECTS_FAILURE: bool;
}

/// Marker: the action must succeed and every result check must hold.
#[derive(Debug, Clone, Copy, Default)]
pub struct Succeeds;

/// Marker: the action must raise an error accepted by every error check.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fails;

impl AssertionMode for Succeeds {
    const EXPECTS_FAILURE: bool = false;
}

impl AssertionMode for Fails {
    const EXPECTS_FAILURE: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_conversions() {
        assert!(true.into_verdict().is_ok());
        assert_eq!(
            false.into_verdict().unwrap_err().as_ref(),
            "predicate returned false"
        );
        assert!(().into_verdict().is_ok());
        assert_eq!(
            Err::<(), _>("status was 500").into_verdict().unwrap_err().as_ref(),
            "status was 500"
        );
    }

    #[tokio::test]
    async fn async_check_sees_borrowed_value() {
        let check = Check::<Vec<u8>>::future("non-empty".into(), |v: &Vec<u8>| {
            let len = v.len();
            async move { len > 0 }
        });
        assert!((check.eval)(&vec![1]).await.is_ok());
        assert!((check.eval)(&Vec::new()).await.is_err());
    }
}
