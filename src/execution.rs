//! Running asserted scenarios.
//!
//! The [`Runner`] drives a [`Scenario<Asserted>`](crate::Asserted) through
//! arrange, act and assert, strictly in that order, and reduces the run to an
//! [`Outcome`] wrapped in a [`Report`]. Every run is raced against a
//! [`CancelSignal`], so a cancelled or timed-out run stops at whatever step it
//! is suspended in.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::assertion::AssertionMode;
use crate::cancel::{CancelReason, CancelSignal};
use crate::error::{Failure, ScenarioError, StepError};
use crate::scenario::{Asserted, Scenario};

/// Get the current Unix timestamp in milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ============================================================================
// Run Identity
// ============================================================================

/// Unique identifier for a single run of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Phase Timing
// ============================================================================

/// The step a run is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Producing the arranged value.
    Arrange,
    /// Running the action.
    Act,
    /// Evaluating assertions.
    Assert,
}

/// How a step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// The step completed.
    Completed,
    /// The step raised or an assertion rejected the value.
    Failed,
    /// The run was cancelled while the step was suspended.
    Cancelled,
}

/// Timing information for one step of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTiming {
    /// Which step.
    pub phase: Phase,
    /// When the step started (Unix timestamp ms).
    pub started_at: u64,
    /// When the step ended (Unix timestamp ms), if it ended.
    pub completed_at: Option<u64>,
    /// How the step ended, if it ended.
    pub status: Option<PhaseStatus>,
}

impl PhaseTiming {
    /// Create a new timing record starting now.
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            started_at: now_millis(),
            completed_at: None,
            status: None,
        }
    }

    /// Mark the step as ended with the given status.
    pub fn complete(&mut self, status: PhaseStatus) {
        self.completed_at = Some(now_millis());
        self.status = Some(status);
    }

    /// Get the duration in milliseconds, if ended.
    pub fn duration_ms(&self) -> Option<u64> {
        self.completed_at
            .map(|end| end.saturating_sub(self.started_at))
    }
}

// ============================================================================
// Outcome & Diagnostics
// ============================================================================

/// Terminal result of running an asserted scenario.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Every assertion held (or the expected failure occurred).
    Pass,
    /// The run failed.
    Fail(Failure),
    /// A failure was expected but the action completed without raising.
    UnexpectedSuccess,
    /// The run was cancelled or timed out.
    Cancelled(CancelReason),
}

impl Outcome {
    /// Returns `true` for [`Outcome::Pass`].
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Short machine-readable name of the outcome.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail(_) => "fail",
            Self::UnexpectedSuccess => "unexpected_success",
            Self::Cancelled(_) => "cancelled",
        }
    }

    /// The failure, for [`Outcome::Fail`].
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Fail(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("passed"),
            Self::Fail(failure) => write!(f, "failed: {failure}"),
            Self::UnexpectedSuccess => {
                f.write_str("was expected to fail, but completed without issue")
            }
            Self::Cancelled(reason) => write!(f, "was cancelled: {reason}"),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let detail = match self {
            Self::Pass | Self::UnexpectedSuccess => None,
            Self::Fail(failure) => Some(failure.to_string()),
            Self::Cancelled(reason) => Some(reason.to_string()),
        };
        let mut state = serializer.serialize_struct("Outcome", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("detail", &detail)?;
        state.end()
    }
}

/// What the act step produced, rendered for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rendered", rename_all = "snake_case")]
pub enum ActedValue {
    /// `Debug` rendering of the acted value.
    Value(String),
    /// `Display` rendering of the raised error.
    Error(String),
}

/// Values observed during a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostic {
    /// `Debug` rendering of the arranged value, if arrange completed.
    pub arranged: Option<String>,
    /// The act step's value or error, if act completed.
    pub acted: Option<ActedValue>,
    /// The failing assertion, or every assertion on a pass.
    pub assertion: Option<Arc<str>>,
    /// One record per step entered.
    pub timings: Vec<PhaseTiming>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(arranged) = &self.arranged {
            write!(f, "\n  arranged: {arranged}")?;
        }
        match &self.acted {
            Some(ActedValue::Value(value)) => write!(f, "\n  acted: {value}")?,
            Some(ActedValue::Error(error)) => write!(f, "\n  acted (error): {error}")?,
            None => {}
        }
        if let Some(assertion) = &self.assertion {
            write!(f, "\n  assertion: {assertion}")?;
        }
        Ok(())
    }
}

/// The result of one run, ready for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Identifier of this run.
    pub run_id: RunId,
    /// Label of the scenario, if any.
    pub label: Option<Arc<str>>,
    /// How the run ended.
    pub outcome: Outcome,
    /// Values observed during the run.
    pub diagnostic: Diagnostic,
}

impl Report {
    /// Returns `true` if the run passed.
    pub fn is_pass(&self) -> bool {
        self.outcome.is_pass()
    }

    /// The label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Convert into a `Result` for adapters that report failures as errors.
    pub fn into_result(self) -> Result<(), ScenarioError> {
        if self.outcome.is_pass() {
            return Ok(());
        }
        Err(ScenarioError {
            label: self.label,
            outcome: self.outcome,
            diagnostic: self.diagnostic,
        })
    }
}

// ============================================================================
// Run State (Internal)
// ============================================================================

struct RunState {
    diagnostic: Diagnostic,
}

impl RunState {
    fn new() -> Self {
        Self {
            diagnostic: Diagnostic::default(),
        }
    }

    fn begin(&mut self, phase: Phase) {
        self.diagnostic.timings.push(PhaseTiming::new(phase));
    }

    fn end(&mut self, status: PhaseStatus) {
        if let Some(timing) = self.diagnostic.timings.last_mut() {
            timing.complete(status);
        }
    }

    /// Close the step that was suspended when the run was cancelled.
    fn cancel_open_phase(&mut self) {
        if let Some(timing) = self.diagnostic.timings.last_mut() {
            if timing.status.is_none() {
                timing.complete(PhaseStatus::Cancelled);
            }
        }
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Cancel a run that takes longer than this.
    pub timeout: Option<Duration>,
    /// Treat panics inside caller closures as raised errors instead of unwinding.
    pub catch_panics: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            catch_panics: true,
        }
    }
}

impl RunConfig {
    /// Set the per-run timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Executes asserted scenarios.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    /// Create a runner with the given configuration.
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// The runner's configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run a scenario once.
    pub async fn run<A, B, M>(&self, scenario: &Scenario<Asserted<A, B, M>>) -> Report
    where
        A: Send + fmt::Debug + 'static,
        B: Send + Sync + fmt::Debug + 'static,
        M: AssertionMode,
    {
        self.run_with(scenario, &CancelSignal::new()).await
    }

    /// Run a scenario once, stopping early if `cancel` fires.
    pub async fn run_with<A, B, M>(
        &self,
        scenario: &Scenario<Asserted<A, B, M>>,
        cancel: &CancelSignal,
    ) -> Report
    where
        A: Send + fmt::Debug + 'static,
        B: Send + Sync + fmt::Debug + 'static,
        M: AssertionMode,
    {
        let run_id = RunId::new();
        let cancel = match self.config.timeout {
            Some(timeout) => cancel.with_timeout(timeout),
            None => cancel.clone(),
        };

        #[cfg(feature = "tracing")]
        tracing::info!(run = %run_id, label = scenario.label(), "scenario.start");

        let mut state = RunState::new();
        let result = tokio::select! {
            biased;
            reason = cancel.cancelled() => Err(reason),
            outcome = self.drive(&scenario.phase, &mut state) => Ok(outcome),
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(reason) => {
                state.cancel_open_phase();
                Outcome::Cancelled(reason)
            }
        };

        #[cfg(feature = "tracing")]
        trace_end(run_id, scenario.label(), &outcome);

        Report {
            run_id,
            label: scenario.label.clone(),
            outcome,
            diagnostic: state.diagnostic,
        }
    }

    /// Await `fut`, turning a panic into a [`StepError`] when configured to.
    async fn guarded<T>(&self, fut: impl Future<Output = T>) -> Result<T, StepError> {
        if self.config.catch_panics {
            AssertUnwindSafe(fut)
                .catch_unwind()
                .await
                .map_err(StepError::from_panic)
        } else {
            Ok(fut.await)
        }
    }

    async fn drive<A, B, M>(&self, phase: &Asserted<A, B, M>, state: &mut RunState) -> Outcome
    where
        A: Send + fmt::Debug + 'static,
        B: Send + Sync + fmt::Debug + 'static,
        M: AssertionMode,
    {
        // Arrange
        state.begin(Phase::Arrange);

        #[cfg(feature = "tracing")]
        tracing::debug!("scenario.arrange");

        let arranged = match self
            .guarded(async { (phase.arrange)().await })
            .await
            .and_then(|r| r)
        {
            Ok(value) => {
                state.end(PhaseStatus::Completed);
                value
            }
            Err(err) => {
                state.end(PhaseStatus::Failed);
                return Outcome::Fail(Failure::Arrange(err));
            }
        };
        state.diagnostic.arranged = Some(format!("{arranged:?}"));

        // Act
        state.begin(Phase::Act);

        #[cfg(feature = "tracing")]
        tracing::debug!("scenario.act");

        let acted = self
            .guarded(async { (phase.act)(arranged).await })
            .await
            .and_then(|r| r);
        match &acted {
            Ok(value) => {
                state.end(PhaseStatus::Completed);
                state.diagnostic.acted = Some(ActedValue::Value(format!("{value:?}")));
            }
            Err(err) => {
                state.end(PhaseStatus::Failed);
                state.diagnostic.acted = Some(ActedValue::Error(err.to_string()));
            }
        }

        // Assert
        #[cfg(feature = "tracing")]
        tracing::debug!("scenario.assert");

        if M::EXPECTS_FAILURE {
            let err = match acted {
                Ok(_) => return Outcome::UnexpectedSuccess,
                Err(err) => err,
            };
            state.begin(Phase::Assert);
            for check in &phase.error_checks {
                let accepted = self
                    .guarded(async { (check.eval)(&err) })
                    .await
                    .unwrap_or(false);
                if !accepted {
                    state.end(PhaseStatus::Failed);
                    state.diagnostic.assertion = Some(check.description.clone());
                    return Outcome::Fail(Failure::UnmatchedError(err));
                }
            }
            state.end(PhaseStatus::Completed);
            return Outcome::Pass;
        }

        let value = match acted {
            Ok(value) => value,
            Err(err) => return Outcome::Fail(Failure::Act(err)),
        };

        state.begin(Phase::Assert);
        for check in &phase.checks {
            let verdict = match self.guarded(async { (check.eval)(&value).await }).await {
                Ok(verdict) => verdict,
                Err(panic) => Err(Arc::from(panic.to_string())),
            };
            if let Err(reason) = verdict {
                state.end(PhaseStatus::Failed);
                state.diagnostic.assertion = Some(check.description.clone());
                return Outcome::Fail(Failure::Assertion {
                    description: check.description.clone(),
                    reason,
                });
            }
        }
        state.end(PhaseStatus::Completed);
        state.diagnostic.assertion = Some(Arc::from(
            phase
                .checks
                .iter()
                .map(|c| c.description.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
        ));
        Outcome::Pass
    }
}

#[cfg(feature = "tracing")]
fn trace_end(run_id: RunId, label: Option<&str>, outcome: &Outcome) {
    if outcome.is_pass() {
        tracing::info!(run = %run_id, label, outcome = "pass", "scenario.end");
    } else {
        tracing::warn!(
            run = %run_id,
            label,
            outcome = outcome.kind(),
            detail = %outcome,
            "scenario.end"
        );
    }
}

// ============================================================================
// Scenario entry points
// ============================================================================

impl<A, B, M> Scenario<Asserted<A, B, M>>
where
    A: Send + fmt::Debug + 'static,
    B: Send + Sync + fmt::Debug + 'static,
    M: AssertionMode,
{
    /// Run once with the default [`Runner`].
    pub async fn run(&self) -> Report {
        Runner::default().run(self).await
    }

    /// Run once with the default [`Runner`], stopping early if `cancel` fires.
    pub async fn run_with(&self, cancel: &CancelSignal) -> Report {
        Runner::default().run_with(self, cancel).await
    }
}

/// Awaiting an asserted scenario runs it and fails with a [`ScenarioError`].
impl<A, B, M> IntoFuture for Scenario<Asserted<A, B, M>>
where
    A: Send + fmt::Debug + 'static,
    B: Send + Sync + fmt::Debug + 'static,
    M: AssertionMode,
{
    type Output = Result<(), ScenarioError>;
    type IntoFuture = BoxFuture<'static, Result<(), ScenarioError>>;

    fn into_future(self) -> Self::IntoFuture {
        async move { self.run().await.into_result() }.boxed()
    }
}
