#![deny(missing_docs)]

//! Beaker: composable Arrange-Act-Assert scenarios.
//!
//! # Design Goals
//!
//! Beaker is focused on **compile-time guarantees**:
//!
//! - **Typestate phases**: a scenario is `Arranged`, `Acted` or `Asserted`, and
//!   only moves forward; asserting twice or acting an asserted scenario does not compile
//! - **Lawful combinators**: `map` and `bind` keep the phase and obey the functor and monad laws
//! - **Explicit retries**: nothing is retried unless a [`Schedule`] says so
//!
//! # Core Concepts
//!
//! - [`Scenario`]: immutable value holding the arrange/act/assert closures and a label
//! - [`Schedule`]: retry policy used by [`repeat_until`] and [`Scenario::act_repeatedly`]
//! - [`Runner`]: executes asserted scenarios into a [`Report`] with an [`Outcome`]
//!
//! ```ignore
//! use beaker::{arrange, Schedule};
//!
//! arrange(1)
//!     .act(|x| x.to_string())
//!     .map(|s| s + "!")
//!     .assert(|r| r == "1!")
//!     .with_label("stringify")
//!     .await?;
//! ```

// Modules
pub mod assertion;
pub mod cancel;
pub mod error;
pub mod execution;
pub mod report;
pub mod retry;
pub mod scenario;
pub mod schedule;
pub mod sequence;
pub mod syntax;
pub mod table;

// Re-exports for convenience
pub use assertion::{AssertionMode, Fails, Succeeds, Verdict};
pub use cancel::{CancelReason, CancelSignal};
pub use error::{BoxError, Failure, ScenarioError, StepError};
pub use execution::{
    ActedValue, Diagnostic, Outcome, Phase, PhaseStatus, PhaseTiming, Report, RunConfig, RunId,
    Runner,
};
#[cfg(feature = "tracing")]
pub use report::TracingSink;
pub use report::{InMemorySink, ReportSink};
pub use retry::{repeat_until, repeat_until_cancelled, RetryReport, RetryStatus};
pub use scenario::{
    arrange, arrange_async, arrange_with, try_arrange, try_arrange_async, Acted, Arranged,
    Asserted, Scenario,
};
pub use schedule::{AttemptOutcome, Decision, Schedule};
pub use sequence::{sequence_acted, sequence_arranged, sequence_asserted, Sequence, Sequenceable};
pub use syntax::{given, given_async, given_with};
pub use table::ScenarioTable;

#[cfg(test)]
mod tests;
