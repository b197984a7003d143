//! Scenario behaviour tests.
//!
//! ## Test Organization
//!
//! - `common`: Shared fixtures (flaky service, service errors, call counters)
//! - `laws`: Functor and monad laws, laziness
//! - `sequence`: Sequencing collections of scenarios
//! - `expected_failure`: Expected-failure assertions
//! - `retry`: Retry schedules and repeated acting
//! - `labels`: Labels, tables and awaited failures
//! - `execution`: Panics, cancellation, timings and serialized reports

mod common;

mod expected_failure;
mod laws;
mod retry;
