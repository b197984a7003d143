//! Given/When/Then vocabulary over the same scenario type.
//!
//! `given(..).when(..).then(..)` builds exactly what
//! `arrange(..).act(..).assert(..)` builds.

use std::future::Future;
use std::sync::Arc;

use crate::assertion::{Fails, Verdict};
use crate::error::{BoxError, StepError};
use crate::scenario::{self, Acted, Arranged, Asserted, Scenario};
use crate::schedule::Schedule;

/// Same as [`arrange`](crate::arrange).
pub fn given<A>(value: A) -> Scenario<Arranged<A>>
where
    A: Clone + Send + Sync + 'static,
{
    scenario::arrange(value)
}

/// Same as [`arrange_with`](crate::arrange_with).
pub fn given_with<A, F>(f: F) -> Scenario<Arranged<A>>
where
    A: Send + 'static,
    F: Fn() -> A + Send + Sync + 'static,
{
    scenario::arrange_with(f)
}

/// Same as [`try_arrange_async`](crate::try_arrange_async).
pub fn given_async<A, E, F, Fut>(f: F) -> Scenario<Arranged<A>>
where
    A: Send + 'static,
    E: Into<BoxError>,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
{
    scenario::try_arrange_async(f)
}

impl<A: Send + 'static> Scenario<Arranged<A>> {
    /// Same as [`act`](Scenario::act).
    pub fn when<B, F>(self, f: F) -> Scenario<Acted<A, B>>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.act(f)
    }

    /// Same as [`try_act_async`](Scenario::try_act_async).
    pub fn when_async<B, E, F, Fut>(self, f: F) -> Scenario<Acted<A, B>>
    where
        B: Send + 'static,
        E: Into<BoxError>,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<B, E>> + Send + 'static,
    {
        self.try_act_async(f)
    }

    /// Same as [`act_repeatedly`](Scenario::act_repeatedly).
    pub fn when_repeatedly<B, E, F, Fut, P>(
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
        self.act_repeatedly(f, schedule, until)
    }
}

impl<A: Send + 'static, B: Send + 'static> Scenario<Acted<A, B>> {
    /// Same as [`assert`](Scenario::assert).
    pub fn then<V, F>(self, pred: F) -> Scenario<Asserted<A, B>>
    where
        V: Verdict,
        F: Fn(&B) -> V + Send + Sync + 'static,
    {
        self.assert(pred)
    }

    /// Same as [`assert_that`](Scenario::assert_that).
    pub fn then_that<V, F>(self, description: impl Into<Arc<str>>, pred: F) -> Scenario<Asserted<A, B>>
    where
        V: Verdict,
        F: Fn(&B) -> V + Send + Sync + 'static,
    {
        self.assert_that(description, pred)
    }

    /// Same as [`assert_async`](Scenario::assert_async).
    pub fn then_async<V, F, Fut>(self, check: F) -> Scenario<Asserted<A, B>>
    where
        V: Verdict,
        F: Fn(&B) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        self.assert_async(check)
    }

    /// Same as [`assert_fails`](Scenario::assert_fails).
    pub fn then_fails(self) -> Scenario<Asserted<A, B, Fails>> {
        self.assert_fails()
    }

    /// Same as [`assert_fails_with`](Scenario::assert_fails_with).
    pub fn then_fails_with<F>(self, pred: F) -> Scenario<Asserted<A, B, Fails>>
    where
        F: Fn(&StepError) -> bool + Send + Sync + 'static,
    {
        self.assert_fails_with(pred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn both_vocabularies_build_the_same_scenario() {
        let bdd = given(1).when(|x| x.to_string()).then(|r| r == "1");
        let aaa = scenario::arrange(1).act(|x| x.to_string()).assert(|r| r == "1");

        let bdd = bdd.run().await;
        let aaa = aaa.run().await;
        assert!(bdd.is_pass());
        assert!(aaa.is_pass());
        assert_eq!(bdd.diagnostic.acted, aaa.diagnostic.acted);
    }

    #[tokio::test]
    async fn then_fails_with_matches_raised_error() {
        let report = given(0)
            .when_async(|x: i32| async move {
                if x == 0 {
                    Err("division by zero")
                } else {
                    Ok(10 / x)
                }
            })
            .then_fails_with(|err| err.to_string().contains("zero"))
            .run()
            .await;
        assert!(report.is_pass());
    }

    #[tokio::test]
    async fn then_fails_expects_any_error() {
        let parse = |text: &'static str| text.parse::<u8>();

        let report = given("300")
            .when_async(move |t| async move { parse(t) })
            .then_fails()
            .run()
            .await;
        assert!(report.is_pass());

        let report = given("30")
            .when_async(move |t| async move { parse(t) })
            .then_fails()
            .run()
            .await;
        assert!(!report.is_pass());
        assert_eq!(report.outcome.kind(), "unexpected_success");
    }

    #[tokio::test]
    async fn given_with_and_given_async_produce_fresh_values() {
        let sync = given_with(|| vec![1, 2, 3])
            .when(|v| v.len())
            .then(|len| *len == 3);
        assert!(sync.run().await.is_pass());

        let fetched = given_async(|| async {
            tokio::task::yield_now().await;
            Ok::<_, std::num::ParseIntError>("42".parse::<i32>()?)
        })
        .when(|x| x + 1)
        .then_async(|x| {
            let x = *x;
            async move { x == 43 }
        });
        assert!(fetched.run().await.is_pass());
    }
}
