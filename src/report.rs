//! Report sinks for scenario runs.

use parking_lot::RwLock;

use crate::execution::Report;

/// Destination for finished run reports.
///
/// Implementations must be thread-safe (`Send + Sync`).
/// Methods are async so sinks may forward reports to external systems.
#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
    /// Record one finished run.
    async fn record(&self, report: &Report);
}

// ============================================================================
// In-Memory Sink
// ============================================================================

/// Collects reports in memory, in the order they were recorded.
///
/// Uses `parking_lot::RwLock` for thread-safe access.
#[derive(Debug, Default)]
pub struct InMemorySink {
    reports: RwLock<Vec<Report>>,
}

impl InMemorySink {
    /// Create a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of recorded reports.
    pub fn len(&self) -> usize {
        self.reports.read().len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.reports.read().is_empty()
    }

    /// Clone out every recorded report.
    pub fn reports(&self) -> Vec<Report> {
        self.reports.read().clone()
    }

    /// Clone out the reports of runs that did not pass.
    pub fn failures(&self) -> Vec<Report> {
        self.reports
            .read()
            .iter()
            .filter(|r| !r.is_pass())
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl ReportSink for InMemorySink {
    async fn record(&self, report: &Report) {
        self.reports.write().push(report.clone());
    }
}

// ============================================================================
// Tracing Sink
// ============================================================================

/// Emits one `tracing` event per report.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[cfg(feature = "tracing")]
#[async_trait::async_trait]
impl ReportSink for TracingSink {
    async fn record(&self, report: &Report) {
        if report.is_pass() {
            tracing::info!(run = %report.run_id, label = report.label(), "scenario.passed");
        } else {
            tracing::error!(
                run = %report.run_id,
                label = report.label(),
                outcome = report.outcome.kind(),
                detail = %report.outcome,
                diagnostic = %report.diagnostic,
                "scenario.failed"
            );
        }
    }
}
