//! Ordered tables of labelled scenarios (data rows for table-driven tests).
//!
//! A table is an immutable, ordered list owned by the caller. It can be run
//! row by row, run as a whole, or arranged as data for another scenario.

use std::fmt;
use std::sync::Arc;

use crate::assertion::AssertionMode;
use crate::execution::{Report, Runner};
use crate::report::ReportSink;
use crate::scenario::{arrange, Arranged, Asserted, Scenario};

/// Ordered rows of scenarios in the same phase.
pub struct ScenarioTable<P> {
    rows: Vec<Scenario<P>>,
}

impl<P: Clone> Clone for ScenarioTable<P> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
        }
    }
}

impl<P> fmt::Debug for ScenarioTable<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.labels()).finish()
    }
}

impl<P> Default for ScenarioTable<P> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<P> FromIterator<Scenario<P>> for ScenarioTable<P> {
    fn from_iter<I: IntoIterator<Item = Scenario<P>>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<P> ScenarioTable<P> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row, keeping the scenario's own label.
    pub fn push(mut self, scenario: Scenario<P>) -> Self {
        self.rows.push(scenario);
        self
    }

    /// Append a row under `label`.
    pub fn row(self, label: impl Into<Arc<str>>, scenario: Scenario<P>) -> Self {
        self.push(scenario.with_label(label))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get the row at `index`.
    pub fn get(&self, index: usize) -> Option<&Scenario<P>> {
        self.rows.get(index)
    }

    /// Iterate over the rows in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Scenario<P>> {
        self.rows.iter()
    }

    /// Row labels in order.
    pub fn labels(&self) -> Vec<Option<&str>> {
        self.rows.iter().map(Scenario::label).collect()
    }
}

impl<P> IntoIterator for ScenarioTable<P> {
    type Item = Scenario<P>;
    type IntoIter = std::vec::IntoIter<Scenario<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<P> ScenarioTable<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Arrange the rows themselves as the value of a new scenario.
    pub fn arrange_rows(self) -> Scenario<Arranged<Vec<Scenario<P>>>> {
        arrange(self.rows)
    }
}

impl<A, B, M> ScenarioTable<Asserted<A, B, M>>
where
    A: Send + fmt::Debug + 'static,
    B: Send + Sync + fmt::Debug + 'static,
    M: AssertionMode,
{
    /// Run every row in order, recording each report in `sink`.
    pub async fn run_all(&self, runner: &Runner, sink: &dyn ReportSink) -> Vec<Report> {
        let mut reports = Vec::with_capacity(self.rows.len());
        for scenario in &self.rows {
            #[cfg(feature = "tracing")]
            tracing::debug!(row = reports.len(), label = scenario.label(), "table.row");

            let report = runner.run(scenario).await;
            sink.record(&report).await;
            reports.push(report);
        }
        reports
    }
}
