//! Functor and monad laws for `map`/`bind`, and laziness of every combinator.

use crate::{arrange, arrange_with, Acted, Arranged, Scenario};

use super::common::Counter;

fn double(x: i32) -> i32 {
    x * 2
}

fn increment(x: i32) -> i32 {
    x + 1
}

fn arranged_f(x: i32) -> Scenario<Arranged<i32>> {
    arrange(x + 10)
}

fn arranged_g(x: i32) -> Scenario<Arranged<String>> {
    arrange(format!("<{x}>"))
}

fn acted_f(x: i32) -> Scenario<Acted<i32, i32>> {
    arrange(x).act(|v| v * 3)
}

fn acted_g(x: i32) -> Scenario<Acted<i32, String>> {
    arrange(x).act(|v| v.to_string())
}

// ============================================================================
// Arranged
// ============================================================================

#[tokio::test]
async fn arranged_map_identity() {
    let m = arrange(7);
    let mapped = m.clone().map(|x| x);
    assert_eq!(m.evaluate().await.ok(), mapped.evaluate().await.ok());
}

#[tokio::test]
async fn arranged_map_composition() {
    let chained = arrange(7).map(double).map(increment);
    let composed = arrange(7).map(|x| increment(double(x)));
    assert_eq!(chained.evaluate().await.ok(), Some(15));
    assert_eq!(composed.evaluate().await.ok(), Some(15));
}

#[tokio::test]
async fn arranged_bind_left_identity() {
    let bound = arrange(5).bind(arranged_f);
    assert_eq!(
        bound.evaluate().await.ok(),
        arranged_f(5).evaluate().await.ok()
    );
}

#[tokio::test]
async fn arranged_bind_right_identity() {
    let m = arrange(5).map(double);
    let bound = m.clone().bind(arrange);
    assert_eq!(bound.evaluate().await.ok(), m.evaluate().await.ok());
}

#[tokio::test]
async fn arranged_bind_associativity() {
    let left = arrange(1).bind(arranged_f).bind(arranged_g);
    let right = arrange(1).bind(|x| arranged_f(x).bind(arranged_g));
    assert_eq!(left.evaluate().await.ok(), Some("<11>".to_owned()));
    assert_eq!(right.evaluate().await.ok(), Some("<11>".to_owned()));
}

#[tokio::test]
async fn bind_map_projects_both_values() {
    let pair = arrange(2).bind_map(|x| arrange(*x * 10), |a, c| (a, c));
    assert_eq!(pair.evaluate().await.ok(), Some((2, 20)));
}

#[tokio::test]
async fn zip_pairs_in_order() {
    let zipped = arrange("left").zip(arrange(1));
    assert_eq!(zipped.evaluate().await.ok(), Some(("left", 1)));
}

// ============================================================================
// Acted
// ============================================================================

#[tokio::test]
async fn acted_map_identity() {
    let m = arrange(4).act(double);
    let mapped = m.clone().map(|x| x);
    assert_eq!(m.evaluate().await.ok(), mapped.evaluate().await.ok());
}

#[tokio::test]
async fn acted_map_composition() {
    let chained = arrange(4).act(double).map(increment).map(double);
    let composed = arrange(4).act(double).map(|x| double(increment(x)));
    assert_eq!(chained.evaluate().await.ok(), Some(18));
    assert_eq!(composed.evaluate().await.ok(), Some(18));
}

#[tokio::test]
async fn acted_bind_left_identity() {
    let bound = arrange(()).act(|_| 6).bind(acted_f);
    assert_eq!(bound.evaluate().await.ok(), acted_f(6).evaluate().await.ok());
}

#[tokio::test]
async fn acted_bind_right_identity() {
    let m = arrange(3).act(increment);
    let bound = m.clone().bind(|b| arrange(b).act(|x| x));
    assert_eq!(bound.evaluate().await.ok(), m.evaluate().await.ok());
}

#[tokio::test]
async fn acted_bind_associativity() {
    let left = arrange(2).act(increment).bind(acted_f).bind(acted_g);
    let right = arrange(2)
        .act(increment)
        .bind(|x| acted_f(x).bind(acted_g));
    assert_eq!(left.evaluate().await.ok(), Some("9".to_owned()));
    assert_eq!(right.evaluate().await.ok(), Some("9".to_owned()));
}

#[tokio::test]
async fn acted_bind_map_projects_both_results() {
    let pair = arrange(2)
        .act(double)
        .bind_map(|b| acted_g(*b), |b, d| format!("{b}:{d}"));
    assert_eq!(pair.evaluate().await.ok(), Some("4:4".to_owned()));
}

// ============================================================================
// Laziness
// ============================================================================

#[tokio::test]
async fn nothing_runs_until_the_scenario_runs() {
    let arranged = Counter::default();
    let acted = Counter::default();
    let asserted = Counter::default();

    let scenario = {
        let arranged = arranged.clone();
        let acted = acted.clone();
        let asserted = asserted.clone();
        arrange_with(move || arranged.hit())
            .map(|x| x)
            .bind(|x| arrange(x as i32))
            .act(move |x| {
                acted.hit();
                x
            })
            .map(increment)
            .assert(move |_| {
                asserted.hit();
                true
            })
            .with_label("lazy")
    };

    assert_eq!((arranged.get(), acted.get(), asserted.get()), (0, 0, 0));

    assert!(scenario.run().await.is_pass());
    assert_eq!((arranged.get(), acted.get(), asserted.get()), (1, 1, 1));

    // Each run re-invokes every closure.
    assert!(scenario.run().await.is_pass());
    assert_eq!((arranged.get(), acted.get(), asserted.get()), (2, 2, 2));
}
