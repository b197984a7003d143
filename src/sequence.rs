//! Sequencing a collection of same-phase scenarios into one.
//!
//! The sequenced scenario's value is the ordered vector of the constituents'
//! values. Constituents run concurrently, results keep input order, and an
//! error from any constituent fails the aggregate step with its index and label.

use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{self, try_join_all, BoxFuture};
use futures::FutureExt;

use crate::assertion::{Check, Succeeds};
use crate::error::StepError;
use crate::scenario::{action, producer, Acted, Arranged, Asserted, Producer, Scenario};

type Labelled<T> = (Option<Arc<str>>, T);

/// Run one constituent, tagging its error or panic with its position and label.
///
/// `fut` must not call the constituent's closure before it is first polled,
/// so a panic in the closure is caught here too.
fn constituent<T, Fut>(
    index: usize,
    label: Option<Arc<str>>,
    fut: Fut,
) -> impl Future<Output = Result<T, StepError>>
where
    Fut: Future<Output = Result<T, StepError>>,
{
    AssertUnwindSafe(fut).catch_unwind().map(move |caught| {
        caught
            .unwrap_or_else(|payload| Err(StepError::from_panic(payload)))
            .map_err(|err| err.in_constituent(index, label))
    })
}

fn join_arranges<A: Send + 'static>(items: Arc<Vec<Labelled<Producer<A>>>>) -> Producer<Vec<A>> {
    producer(move || {
        let pending: Vec<_> = items
            .iter()
            .enumerate()
            .map(|(index, (label, arrange))| {
                let arrange = Arc::clone(arrange);
                constituent(index, label.clone(), async move { arrange().await })
            })
            .collect();
        try_join_all(pending)
    })
}

/// Sequence arranged scenarios. An empty input arranges an empty vector.
pub fn sequence_arranged<A, I>(scenarios: I) -> Scenario<Arranged<Vec<A>>>
where
    A: Send + 'static,
    I: IntoIterator<Item = Scenario<Arranged<A>>>,
{
    let items: Vec<_> = scenarios
        .into_iter()
        .map(|s| (s.label, s.phase.arrange))
        .collect();
    Scenario::with_phase(
        None,
        Arranged {
            arrange: join_arranges(Arc::new(items)),
        },
    )
}

/// Sequence acted scenarios: all arranges run, then every action on its own value.
pub fn sequence_acted<A, B, I>(scenarios: I) -> Scenario<Acted<Vec<A>, Vec<B>>>
where
    A: Send + 'static,
    B: Send + 'static,
    I: IntoIterator<Item = Scenario<Acted<A, B>>>,
{
    let (arranges, acts): (Vec<_>, Vec<_>) = scenarios
        .into_iter()
        .map(|s| {
            (
                (s.label.clone(), s.phase.arrange),
                (s.label, s.phase.act),
            )
        })
        .unzip();
    let acts = Arc::new(acts);

    Scenario::with_phase(
        None,
        Acted {
            arrange: join_arranges(Arc::new(arranges)),
            act: action(move |values: Vec<A>| {
                let pending: Vec<_> = acts
                    .iter()
                    .zip(values)
                    .enumerate()
                    .map(|(index, ((label, act), value))| {
                        let act = Arc::clone(act);
                        constituent(index, label.clone(), async move { act(value).await })
                    })
                    .collect();
                try_join_all(pending)
            }),
        },
    )
}

/// Evaluate one constituent check, turning a panic into a failed verdict.
fn verdict_of<B>(check: &Check<B>, value: &B) -> BoxFuture<'static, Result<(), Arc<str>>> {
    let panicked = |payload: Box<dyn Any + Send>| -> Result<(), Arc<str>> {
        Err(Arc::from(StepError::from_panic(payload).to_string()))
    };
    match std::panic::catch_unwind(AssertUnwindSafe(|| (check.eval)(value))) {
        Ok(verdict) => AssertUnwindSafe(verdict)
            .catch_unwind()
            .map(move |caught| caught.unwrap_or_else(panicked))
            .boxed(),
        Err(payload) => future::ready(panicked(payload)).boxed(),
    }
}

/// Sequence asserted scenarios.
///
/// Each constituent's assertions are applied to its own result. Further
/// assertions added with [`and`](Scenario::and) see the whole result vector.
/// Only scenarios that expect success can be sequenced.
pub fn sequence_asserted<A, B, I>(scenarios: I) -> Scenario<Asserted<Vec<A>, Vec<B>>>
where
    A: Send + 'static,
    B: Send + Sync + 'static,
    I: IntoIterator<Item = Scenario<Asserted<A, B, Succeeds>>>,
{
    let mut acted = Vec::new();
    let mut checks = Vec::new();
    for scenario in scenarios {
        let Asserted {
            arrange,
            act,
            checks: own,
            ..
        } = scenario.phase;
        checks.push((scenario.label.clone(), own));
        acted.push(Scenario::with_phase(scenario.label, Acted { arrange, act }));
    }
    let constituents = Arc::new(checks);

    let every = Check::from_fn(
        Arc::from("every sequenced assertion holds"),
        move |values: &Vec<B>| {
            let pending: Vec<_> = constituents
                .iter()
                .zip(values)
                .enumerate()
                .flat_map(|(index, ((label, checks), value))| {
                    checks.iter().map(move |check| {
                        (
                            index,
                            label.clone(),
                            check.description.clone(),
                            verdict_of(check, value),
                        )
                    })
                })
                .collect();

            async move {
                for (index, label, description, verdict) in pending {
                    if let Err(reason) = verdict.await {
                        let who = match label {
                            Some(label) => format!("constituent #{index} ({label})"),
                            None => format!("constituent #{index}"),
                        };
                        return Err(Arc::from(format!(
                            "{who}: assertion `{description}` failed: {reason}"
                        )));
                    }
                }
                Ok(())
            }
            .boxed()
        },
    );

    let Acted { arrange, act } = sequence_acted(acted).phase;
    Scenario::with_phase(
        None,
        Asserted {
            arrange,
            act,
            checks: vec![every],
            error_checks: Vec::new(),
            _mode: PhantomData,
        },
    )
}

/// Scenario types that can be sequenced.
pub trait Sequenceable: Sized {
    /// The sequenced scenario type.
    type Output;

    /// Combine `scenarios` into one scenario producing their ordered values.
    fn sequence_all<I: IntoIterator<Item = Self>>(scenarios: I) -> Self::Output;
}

impl<A: Send + 'static> Sequenceable for Scenario<Arranged<A>> {
    type Output = Scenario<Arranged<Vec<A>>>;

    fn sequence_all<I: IntoIterator<Item = Self>>(scenarios: I) -> Self::Output {
        sequence_arranged(scenarios)
    }
}

impl<A: Send + 'static, B: Send + 'static> Sequenceable for Scenario<Acted<A, B>> {
    type Output = Scenario<Acted<Vec<A>, Vec<B>>>;

    fn sequence_all<I: IntoIterator<Item = Self>>(scenarios: I) -> Self::Output {
        sequence_acted(scenarios)
    }
}

impl<A: Send + 'static, B: Send + Sync + 'static> Sequenceable for Scenario<Asserted<A, B, Succeeds>> {
    type Output = Scenario<Asserted<Vec<A>, Vec<B>>>;

    fn sequence_all<I: IntoIterator<Item = Self>>(scenarios: I) -> Self::Output {
        sequence_asserted(scenarios)
    }
}

/// `.sequence()` on any collection of same-phase scenarios.
pub trait Sequence {
    /// The sequenced scenario type.
    type Output;

    /// Combine the scenarios into one producing the ordered vector of their values.
    fn sequence(self) -> Self::Output;
}

impl<I> Sequence for I
where
    I: IntoIterator,
    I::Item: Sequenceable,
{
    type Output = <I::Item as Sequenceable>::Output;

    fn sequence(self) -> Self::Output {
        <I::Item as Sequenceable>::sequence_all(self)
    }
}
