//! Expected-failure assertions.

use crate::{arrange, try_arrange, Failure, Outcome};

use super::common::ServiceError;

fn checked_div(x: i32) -> Result<i32, ServiceError> {
    if x == 0 {
        Err(ServiceError::BadRequest("division by zero".into()))
    } else {
        Ok(100 / x)
    }
}

#[tokio::test]
async fn raised_error_passes() {
    let report = arrange(0).try_act(checked_div).assert_fails().run().await;
    assert!(report.is_pass());
}

#[tokio::test]
async fn predicate_and_type_checks_on_the_error() {
    let report = arrange(0)
        .try_act(checked_div)
        .assert_fails_with(|err| err.to_string().contains("zero"))
        .and_error_is::<ServiceError>()
        .run()
        .await;
    assert!(report.is_pass(), "{}", report.outcome);
}

#[tokio::test]
async fn completing_action_is_an_unexpected_success() {
    let report = arrange(4).try_act(checked_div).assert_fails().run().await;
    assert!(matches!(report.outcome, Outcome::UnexpectedSuccess));
    assert_eq!(
        report.outcome.to_string(),
        "was expected to fail, but completed without issue"
    );
}

#[tokio::test]
async fn rejected_error_is_unmatched() {
    let report = arrange(0)
        .try_act(checked_div)
        .assert_fails_with(|err| err.to_string().contains("overflow"))
        .run()
        .await;
    match report.outcome {
        Outcome::Fail(Failure::UnmatchedError(err)) => {
            assert_eq!(
                err.downcast_ref::<ServiceError>(),
                Some(&ServiceError::BadRequest("division by zero".into()))
            );
        }
        other => panic!("expected unmatched error, got {other:?}"),
    }
}

#[tokio::test]
async fn arrange_failure_is_not_an_expected_failure() {
    let report = try_arrange(|| Err::<i32, _>(ServiceError::Unavailable))
        .try_act(checked_div)
        .assert_fails()
        .run()
        .await;
    assert!(matches!(
        report.outcome,
        Outcome::Fail(Failure::Arrange(_))
    ));
    assert!(report.diagnostic.acted.is_none());
}

#[tokio::test]
async fn act_error_fails_a_success_scenario() {
    let report = arrange(0)
        .try_act(checked_div)
        .assert(|x| *x > 0)
        .run()
        .await;
    assert!(matches!(report.outcome, Outcome::Fail(Failure::Act(_))));
}

#[tokio::test]
async fn every_error_predicate_must_accept() {
    let scenario = arrange(0)
        .try_act(checked_div)
        .assert_fails()
        .and_error(|err| !err.is_panic())
        .and_error(|err| err.to_string().starts_with("bad request"));
    assert!(scenario.run().await.is_pass());

    let report = scenario
        .and_error(|err| err.to_string().contains("overflow"))
        .run()
        .await;
    assert!(matches!(
        report.outcome,
        Outcome::Fail(Failure::UnmatchedError(_))
    ));
    assert_eq!(
        report.diagnostic.assertion.as_deref(),
        Some("expected failure #3")
    );
}
