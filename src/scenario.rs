//! Phase-typed scenarios.
//!
//! A [`Scenario`] moves through three phases, each a distinct type:
//!
//! - [`Arranged`]: only a value producer exists
//! - [`Acted`]: a producer and an action; the action's result type is fixed
//! - [`Asserted`]: producer, action and assertions; ready to run
//!
//! Only `act*` and `assert*` advance a scenario. `map` and `bind` keep the
//! phase, so a scenario can never go backwards or be asserted twice. Every
//! combinator consumes the scenario and returns a new one; closures are only
//! invoked when the scenario is run.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;

use crate::assertion::{default_description, Check, ErrorCheck, Fails, Succeeds, Verdict};
use crate::error::{BoxError, StepError};
use crate::retry;
use crate::schedule::Schedule;

pub(crate) type Producer<A> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<A, StepError>> + Send + Sync>;
pub(crate) type Action<A, B> =
    Arc<dyn Fn(A) -> BoxFuture<'static, Result<B, StepError>> + Send + Sync>;

pub(crate) fn producer<A, F, Fut>(f: F) -> Producer<A>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, StepError>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

pub(crate) fn action<A, B, F, Fut>(f: F) -> Action<A, B>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<B, StepError>> + Send + 'static,
{
    Arc::new(move |a| f(a).boxed())
}

// ============================================================================
// Phases
// ============================================================================

/// Phase: a value producer exists.
pub struct Arranged<A> {
    pub(crate) arrange: Producer<A>,
}

/// Phase: a value producer and an action exist.
pub struct Acted<A, B> {
    pub(crate) arrange: Producer<A>,
    pub(crate) act: Action<A, B>,
}

/// Phase: producer, action and assertions exist.
///
/// `M` is [`Succeeds`] for result checks or [`Fails`] for expected-failure checks.
pub struct Asserted<A, B, M = Succeeds> {
    pub(crate) arrange: Producer<A>,
    pub(crate) act: Action<A, B>,
    pub(crate) checks: Vec<Check<B>>,
    pub(crate) error_checks: Vec<ErrorCheck>,
    pub(crate) _mode: PhantomData<M>,
}

impl<A> Clone for Arranged<A> {
    fn clone(&self) -> Self {
        Self {
            arrange: Arc::clone(&self.arrange),
        }
    }
}

impl<A, B> Clone for Acted<A, B> {
    fn clone(&self) -> Self {
        Self {
            arrange: Arc::clone(&self.arrange),
            act: Arc::clone(&self.act),
        }
    }
}

impl<A, B, M> Clone for Asserted<A, B, M> {
    fn clone(&self) -> Self {
        Self {
            arrange: Arc::clone(&self.arrange),
            act: Arc::clone(&self.act),
            checks: self.checks.clone(),
            error_checks: self.error_checks.clone(),
            _mode: PhantomData,
        }
    }
}

// ============================================================================
// Scenario
// ============================================================================

/// An immutable, phase-tagged test scenario.
pub struct Scenario<P> {
    pub(crate) label: Option<Arc<str>>,
    pub(crate) phase: P,
}

impl<P: Clone> Clone for Scenario<P> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            phase: self.phase.clone(),
        }
    }
}

impl<P> std::fmt::Debug for Scenario<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("label", &self.label)
            .field("phase", &std::any::type_name::<P>())
            .finish()
    }
}

impl<P> Scenario<P> {
    pub(crate) fn with_phase(label: Option<Arc<str>>, phase: P) -> Self {
        Self { label, phase }
    }

    /// Attach (or replace) the descriptive label. The phase is unchanged.
    pub fn with_label(mut self, label: impl Into<Arc<str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The descriptive label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Arrange a literal value, cloned for every run.
pub fn arrange<A>(value: A) -> Scenario<Arranged<A>>
where
    A: Clone + Send + Sync + 'static,
{
    arrange_with(move || value.clone())
}

/// Arrange from a zero-argument producer, called once per run.
pub fn arrange_with<A, F>(f: F) -> Scenario<Arranged<A>>
where
    A: Send + 'static,
    F: Fn() -> A + Send + Sync + 'static,
{
    Scenario::with_phase(
        None,
        Arranged {
            arrange: producer(move || future::ready(Ok(f()))),
        },
    )
}

/// Arrange from a fallible producer.
pub fn try_arrange<A, E, F>(f: F) -> Scenario<Arranged<A>>
where
    A: Send + 'static,
    E: Into<BoxError>,
    F: Fn() -> Result<A, E> + Send + Sync + 'static,
{
    Scenario::with_phase(
        None,
        Arranged {
            arrange: producer(move || future::ready(f().map_err(StepError::new))),
        },
    )
}

/// Arrange from an asynchronous producer.
pub fn arrange_async<A, F, Fut>(f: F) -> Scenario<Arranged<A>>
where
    A: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = A> + Send + 'static,
{
    Scenario::with_phase(
        None,
        Arranged {
            arrange: producer(move || f().map(Ok)),
        },
    )
}

/// Arrange from a fallible asynchronous producer.
pub fn try_arrange_async<A, E, F, Fut>(f: F) -> Scenario<Arranged<A>>
where
    A: Send + 'static,
    E: Into<BoxError>,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
{
    Scenario::with_phase(
        None,
        Arranged {
            arrange: producer(move || f().map(|r| r.map_err(StepError::new))),
        },
    )
}

// ============================================================================
// Arranged
// ============================================================================

impl<A: Send + 'static> Scenario<Arranged<A>> {
    /// Transform the eventual arranged value.
    pub fn map<C, F>(self, f: F) -> Scenario<Arranged<C>>
    where
        C: Send + 'static,
        F: Fn(A) -> C + Send + Sync + 'static,
    {
        let prev = self.phase.arrange;
        let f = Arc::new(f);
        Scenario::with_phase(
            self.label,
            Arranged {
                arrange: producer(move || {
                    let f = Arc::clone(&f);
                    prev().map(move |r| r.map(|a| f(a)))
                }),
            },
        )
    }

    /// Arrange a second scenario from this one's eventual value.
    ///
    /// The second scenario's label is ignored; this scenario's label is kept.
    pub fn bind<C, F>(self, f: F) -> Scenario<Arranged<C>>
    where
        C: Send + 'static,
        F: Fn(A) -> Scenario<Arranged<C>> + Send + Sync + 'static,
    {
        let prev = self.phase.arrange;
        let f = Arc::new(f);
        Scenario::with_phase(
            self.label,
            Arranged {
                arrange: producer(move || {
                    let first = prev();
                    let f = Arc::clone(&f);
                    async move {
                        let a = first.await?;
                        let next = f(a);
                        (next.phase.arrange)().await
                    }
                }),
            },
        )
    }

    /// Bind, then combine both values with `project`.
    pub fn bind_map<C, D, F, G>(self, f: F, project: G) -> Scenario<Arranged<D>>
    where
        C: Send + 'static,
        D: Send + 'static,
        F: Fn(&A) -> Scenario<Arranged<C>> + Send + Sync + 'static,
        G: Fn(A, C) -> D + Send + Sync + 'static,
    {
        let prev = self.phase.arrange;
        let f = Arc::new(f);
        let project = Arc::new(project);
        Scenario::with_phase(
            self.label,
            Arranged {
                arrange: producer(move || {
                    let first = prev();
                    let f = Arc::clone(&f);
                    let project = Arc::clone(&project);
                    async move {
                        let a = first.await?;
                        let next = f(&a);
                        let c = (next.phase.arrange)().await?;
                        Ok(project(a, c))
                    }
                }),
            },
        )
    }

    /// Arrange both scenarios, this one first, and pair their values.
    pub fn zip<C: Send + 'static>(self, other: Scenario<Arranged<C>>) -> Scenario<Arranged<(A, C)>> {
        let left = self.phase.arrange;
        let right = other.phase.arrange;
        Scenario::with_phase(
            self.label.or(other.label),
            Arranged {
                arrange: producer(move || {
                    let left = left();
                    let right = Arc::clone(&right);
                    async move {
                        let a = left.await?;
                        let c = right().await?;
                        Ok((a, c))
                    }
                }),
            },
        )
    }

    /// Run the producer once and return its value.
    pub async fn evaluate(&self) -> Result<A, StepError> {
        (self.phase.arrange)().await
    }

    fn advance<B>(self, act: Action<A, B>) -> Scenario<Acted<A, B>> {
        Scenario::with_phase(
            self.label,
            Acted {
                arrange: self.phase.arrange,
                act,
            },
        )
    }

    /// Attach the action. It runs lazily, once per run.
    pub fn act<B, F>(self, f: F) -> Scenario<Acted<A, B>>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.advance(action(move |a| future::ready(Ok(f(a)))))
    }

    /// Attach a fallible action.
    pub fn try_act<B, E, F>(self, f: F) -> Scenario<Acted<A, B>>
    where
        B: Send + 'static,
        E: Into<BoxError>,
        F: Fn(A) -> Result<B, E> + Send + Sync + 'static,
    {
        self.advance(action(move |a| future::ready(f(a).map_err(StepError::new))))
    }

    /// Attach an asynchronous action.
    pub fn act_async<B, F, Fut>(self, f: F) -> Scenario<Acted<A, B>>
    where
        B: Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = B> + Send + 'static,
    {
        self.advance(action(move |a| f(a).map(Ok)))
    }

    /// Attach a fallible asynchronous action.
    pub fn try_act_async<B, E, F, Fut>(self, f: F) -> Scenario<Acted<A, B>>
    where
        B: Send + 'static,
        E: Into<BoxError>,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<B, E>> + Send + 'static,
    {
        self.advance(action(move |a| f(a).map(|r| r.map_err(StepError::new))))
    }

    /// Attach an action that is re-invoked until `until` holds or `schedule` stops.
    ///
    /// The acted value is the last observed result: either the one that
    /// satisfied `until`, or the last one before the schedule gave up. An
    /// error from the final attempt becomes the act step's error.
    pub fn act_repeatedly<B, E, F, Fut, P>(
        self,
        f: F,
        schedule: Schedule,
        until: P,
    ) -> Scenario<Acted<A, B>>
    where
        A: Clone,
        B: Send + 'static,
        E: Into<BoxError>,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<B, E>> + Send + 'static,
        P: Fn(&B) -> bool + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let until = Arc::new(until);
        let schedule = Arc::new(schedule);
        self.advance(action(move |a: A| {
            let f = Arc::clone(&f);
            let until = Arc::clone(&until);
            let schedule = Arc::clone(&schedule);
            async move {
                retry::drive(
                    a,
                    |input| f(input).map(|r| r.map_err(StepError::new)),
                    &schedule,
                    |value| until(value),
                )
                .await
                .into_result()
            }
        }))
    }
}

// ============================================================================
// Acted
// ============================================================================

impl<A: Send + 'static, B: Send + 'static> Scenario<Acted<A, B>> {
    /// Transform the eventual act result.
    pub fn map<C, F>(self, f: F) -> Scenario<Acted<A, C>>
    where
        C: Send + 'static,
        F: Fn(B) -> C + Send + Sync + 'static,
    {
        let prev = self.phase.act;
        let f = Arc::new(f);
        Scenario::with_phase(
            self.label,
            Acted {
                arrange: self.phase.arrange,
                act: action(move |a| {
                    let f = Arc::clone(&f);
                    prev(a).map(move |r| r.map(|b| f(b)))
                }),
            },
        )
    }

    /// Arrange and act a second scenario from this one's act result.
    ///
    /// The second scenario runs entirely inside this scenario's act step.
    pub fn bind<C, D, F>(self, f: F) -> Scenario<Acted<A, D>>
    where
        C: Send + 'static,
        D: Send + 'static,
        F: Fn(B) -> Scenario<Acted<C, D>> + Send + Sync + 'static,
    {
        let prev = self.phase.act;
        let f = Arc::new(f);
        Scenario::with_phase(
            self.label,
            Acted {
                arrange: self.phase.arrange,
                act: action(move |a| {
                    let first = prev(a);
                    let f = Arc::clone(&f);
                    async move {
                        let b = first.await?;
                        let next = f(b);
                        let c = (next.phase.arrange)().await?;
                        (next.phase.act)(c).await
                    }
                }),
            },
        )
    }

    /// Bind, then combine both results with `project`.
    pub fn bind_map<C, D, E, F, G>(self, f: F, project: G) -> Scenario<Acted<A, E>>
    where
        C: Send + 'static,
        D: Send + 'static,
        E: Send + 'static,
        F: Fn(&B) -> Scenario<Acted<C, D>> + Send + Sync + 'static,
        G: Fn(B, D) -> E + Send + Sync + 'static,
    {
        let prev = self.phase.act;
        let f = Arc::new(f);
        let project = Arc::new(project);
        Scenario::with_phase(
            self.label,
            Acted {
                arrange: self.phase.arrange,
                act: action(move |a| {
                    let first = prev(a);
                    let f = Arc::clone(&f);
                    let project = Arc::clone(&project);
                    async move {
                        let b = first.await?;
                        let next = f(&b);
                        let c = (next.phase.arrange)().await?;
                        let d = (next.phase.act)(c).await?;
                        Ok(project(b, d))
                    }
                }),
            },
        )
    }

    /// Run the producer and the action once and return the act result.
    pub async fn evaluate(&self) -> Result<B, StepError> {
        let a = (self.phase.arrange)().await?;
        (self.phase.act)(a).await
    }

    fn advance(self, check: Check<B>) -> Scenario<Asserted<A, B>> {
        Scenario::with_phase(
            self.label,
            Asserted {
                arrange: self.phase.arrange,
                act: self.phase.act,
                checks: vec![check],
                error_checks: Vec::new(),
                _mode: PhantomData,
            },
        )
    }

    /// Assert on the act result.
    ///
    /// `pred` may return `bool`, `()` or `Result<(), E>`; a panic inside it
    /// (e.g. a failed `assert_eq!`) fails the scenario.
    pub fn assert<V, F>(self, pred: F) -> Scenario<Asserted<A, B>>
    where
        V: Verdict,
        F: Fn(&B) -> V + Send + Sync + 'static,
    {
        self.advance(Check::sync(default_description("assertion", 0), pred))
    }

    /// Assert on the act result, with a description used in failure reports.
    pub fn assert_that<V, F>(self, description: impl Into<Arc<str>>, pred: F) -> Scenario<Asserted<A, B>>
    where
        V: Verdict,
        F: Fn(&B) -> V + Send + Sync + 'static,
    {
        self.advance(Check::sync(description.into(), pred))
    }

    /// Assert asynchronously. `check` borrows the result and returns an owned future.
    pub fn assert_async<V, F, Fut>(self, check: F) -> Scenario<Asserted<A, B>>
    where
        V: Verdict,
        F: Fn(&B) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        self.advance(Check::future(default_description("assertion", 0), check))
    }

    fn expect_failure(self, checks: Vec<ErrorCheck>) -> Scenario<Asserted<A, B, Fails>> {
        Scenario::with_phase(
            self.label,
            Asserted {
                arrange: self.phase.arrange,
                act: self.phase.act,
                checks: Vec::new(),
                error_checks: checks,
                _mode: PhantomData,
            },
        )
    }

    /// Expect the action to raise any error.
    pub fn assert_fails(self) -> Scenario<Asserted<A, B, Fails>> {
        self.expect_failure(Vec::new())
    }

    /// Expect the action to raise an error accepted by `pred`.
    pub fn assert_fails_with<F>(self, pred: F) -> Scenario<Asserted<A, B, Fails>>
    where
        F: Fn(&StepError) -> bool + Send + Sync + 'static,
    {
        self.expect_failure(vec![ErrorCheck::new(
            default_description("expected failure", 0),
            pred,
        )])
    }
}

// ============================================================================
// Asserted
// ============================================================================

impl<A: Send + 'static, B: Send + 'static> Scenario<Asserted<A, B, Succeeds>> {
    /// Add another assertion; all of them must hold, in order.
    pub fn and<V, F>(self, pred: F) -> Self
    where
        V: Verdict,
        F: Fn(&B) -> V + Send + Sync + 'static,
    {
        let description = default_description("assertion", self.phase.checks.len());
        self.push(Check::sync(description, pred))
    }

    /// Add another described assertion.
    pub fn and_that<V, F>(self, description: impl Into<Arc<str>>, pred: F) -> Self
    where
        V: Verdict,
        F: Fn(&B) -> V + Send + Sync + 'static,
    {
        self.push(Check::sync(description.into(), pred))
    }

    /// Add another asynchronous assertion.
    pub fn and_async<V, F, Fut>(self, check: F) -> Self
    where
        V: Verdict,
        F: Fn(&B) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        let description = default_description("assertion", self.phase.checks.len());
        self.push(Check::future(description, check))
    }

    fn push(mut self, check: Check<B>) -> Self {
        self.phase.checks.push(check);
        self
    }

    /// Descriptions of the attached assertions, in evaluation order.
    pub fn assertions(&self) -> Vec<&str> {
        self.phase.checks.iter().map(|c| c.description.as_ref()).collect()
    }
}

impl<A: Send + 'static, B: Send + 'static> Scenario<Asserted<A, B, Fails>> {
    /// Add another predicate the raised error must satisfy.
    pub fn and_error<F>(mut self, pred: F) -> Self
    where
        F: Fn(&StepError) -> bool + Send + Sync + 'static,
    {
        let description = default_description("expected failure", self.phase.error_checks.len());
        self.phase.error_checks.push(ErrorCheck::new(description, pred));
        self
    }

    /// Expect an error of type `E` (downcast through [`StepError::downcast_ref`]).
    pub fn and_error_is<E: std::error::Error + 'static>(self) -> Self {
        self.and_error(|err| err.downcast_ref::<E>().is_some())
    }
}
