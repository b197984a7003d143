//! Repeated invocation under retry schedules.

use std::time::Duration;

use tokio::time::Instant;

use crate::{
    arrange, repeat_until, repeat_until_cancelled, CancelReason, CancelSignal, RetryStatus,
    Schedule,
};

use super::common::{FlakyService, ServiceError};

fn ten_ms_four_times() -> Schedule {
    Schedule::spaced(Duration::from_millis(10)) & Schedule::recurs(4)
}

#[tokio::test(start_paused = true)]
async fn converges_on_third_attempt_after_two_waits() {
    let service = FlakyService::ready_on(3);
    let started = Instant::now();

    let report = repeat_until(
        service.clone(),
        |svc| async move { svc.get("/health").await },
        &ten_ms_four_times(),
        |status| status == "OK",
    )
    .await;

    assert_eq!(report.status, RetryStatus::Satisfied);
    assert_eq!(report.attempts, 3);
    assert_eq!(report.waited, vec![Duration::from_millis(10); 2]);
    assert_eq!(report.total_wait(), Duration::from_millis(20));
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert_eq!(report.into_result().ok().as_deref(), Some("OK"));
    assert_eq!(service.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_schedule_returns_last_result() {
    let service = FlakyService::ready_on(100);

    let report = repeat_until(
        service.clone(),
        |svc| async move { svc.get("/health").await },
        &Schedule::recurs(2),
        |status| status == "OK",
    )
    .await;

    assert_eq!(report.status, RetryStatus::Exhausted);
    assert_eq!(report.attempts, 3);
    assert!(report.waited.iter().all(Duration::is_zero));
    assert_eq!(report.last.ok().as_deref(), Some("500"));
}

#[tokio::test(start_paused = true)]
async fn errors_are_retried_like_unmatched_values() {
    let service = FlakyService::ready_on(3);

    let report = repeat_until(
        service.clone(),
        |svc| async move { svc.try_get("/health").await },
        &ten_ms_four_times(),
        |status| status == "OK",
    )
    .await;

    assert!(report.is_satisfied());
    assert_eq!(report.attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn while_ok_stops_on_first_error() {
    let service = FlakyService::ready_on(3);

    let report = repeat_until(
        service.clone(),
        |svc| async move { svc.try_get("/health").await },
        &(Schedule::recurs(4) & Schedule::while_ok()),
        |status| status == "OK",
    )
    .await;

    assert_eq!(report.status, RetryStatus::Exhausted);
    assert_eq!(report.attempts, 1);
    let err = report.last.expect_err("first attempt raises");
    assert_eq!(
        err.downcast_ref::<ServiceError>(),
        Some(&ServiceError::Unavailable)
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_delay() {
    let service = FlakyService::ready_on(100);
    let cancel = CancelSignal::new();
    let started = Instant::now();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = repeat_until_cancelled(
        service.clone(),
        |svc| async move { svc.get("/health").await },
        &Schedule::spaced(Duration::from_secs(60)),
        |status| status == "OK",
        &cancel,
    )
    .await;

    assert_eq!(result.err(), Some(CancelReason::Requested));
    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(service.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn act_repeatedly_polls_inside_a_scenario() {
    let service = FlakyService::ready_on(3);

    let report = arrange(service.clone())
        .act_repeatedly(
            |svc| async move { svc.get("/orders/1").await },
            ten_ms_four_times(),
            |status| status == "OK",
        )
        .assert(|status| status == "OK")
        .with_label("order becomes visible")
        .run()
        .await;

    assert!(report.is_pass(), "{}", report.outcome);
    assert_eq!(service.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn act_repeatedly_hands_back_the_last_unsatisfying_value() {
    let service = FlakyService::ready_on(100);

    let report = arrange(service)
        .act_repeatedly(
            |svc| async move { svc.get("/orders/1").await },
            ten_ms_four_times(),
            |status| status == "OK",
        )
        .assert_that("order is visible", |status| status == "OK")
        .run()
        .await;

    assert!(!report.is_pass());
    assert_eq!(report.diagnostic.assertion.as_deref(), Some("order is visible"));
}
