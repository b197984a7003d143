//! Scenario demo showing passing and failing runs.
//!
//! Run with: cargo run --example demo
//! Set `RUST_LOG=beaker=debug` to see every step and retry.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use beaker::{arrange, given, InMemorySink, Outcome, ReportSink, RunConfig, Runner, Schedule};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// A fake inventory service
// ============================================================================

#[derive(Debug, Clone, Error)]
enum InventoryError {
    #[error("Item not found: {0}")]
    NotFound(String),
}

/// Becomes consistent after a few reads.
#[derive(Debug, Clone, Default)]
struct Inventory {
    reads: Arc<AtomicU32>,
}

impl Inventory {
    async fn stock(&self, sku: &'static str) -> Result<u32, InventoryError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if sku != "BEAKER-250" {
            return Err(InventoryError::NotFound(sku.to_owned()));
        }
        let reads = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        println!("  [Inventory] read #{reads}");
        Ok(if reads >= 3 { 12 } else { 0 })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let sink = InMemorySink::new();
    let runner = Runner::new(RunConfig::default().with_timeout(Duration::from_secs(5)));

    // ========================================================================
    // SCENARIO 1: Plain arithmetic
    // ========================================================================
    println!("\n=== SCENARIO 1: Plain arithmetic ===\n");

    let report = runner
        .run(
            &arrange(21)
                .act(|x| x * 2)
                .assert(|x| *x == 42)
                .with_label("doubling"),
        )
        .await;
    println!("  {:?}: {}", report.label(), report.outcome);
    sink.record(&report).await;

    // ========================================================================
    // SCENARIO 2: Eventually consistent read, polled every 50ms
    // ========================================================================
    println!("\n=== SCENARIO 2: Eventually consistent read ===\n");

    let inventory = Inventory::default();
    let report = runner
        .run(
            &given(inventory.clone())
                .when_repeatedly(
                    |inv| async move { inv.stock("BEAKER-250").await },
                    Schedule::spaced(Duration::from_millis(50)) & Schedule::recurs(5),
                    |stock| *stock > 0,
                )
                .then_that("stock is visible", |stock| *stock == 12)
                .with_label("restock becomes visible"),
        )
        .await;
    println!("  {:?}: {}", report.label(), report.outcome);
    sink.record(&report).await;

    // ========================================================================
    // SCENARIO 3: Expected failure
    // ========================================================================
    println!("\n=== SCENARIO 3: Unknown item ===\n");

    let report = runner
        .run(
            &given(inventory)
                .when_async(|inv| async move { inv.stock("FLASK-100").await })
                .then_fails_with(|err| err.to_string().contains("not found")),
        )
        .await;
    println!("  {:?}: {}", report.label(), report.outcome);
    sink.record(&report).await;

    // ========================================================================
    // SCENARIO 4: A failing assertion
    // ========================================================================
    println!("\n=== SCENARIO 4: Wrong expectation ===\n");

    let report = runner
        .run(
            &arrange(vec![3, 1, 2])
                .act(|mut v| {
                    v.sort();
                    v
                })
                .assert_that("is reversed", |v| v == &vec![3, 2, 1])
                .with_label("sorting"),
        )
        .await;
    if let Outcome::Fail(failure) = &report.outcome {
        println!("  {:?}: {failure}{}", report.label(), report.diagnostic);
    }
    sink.record(&report).await;

    // ========================================================================
    // Summary
    // ========================================================================
    println!("\n=== Summary ===\n");
    println!(
        "  {} runs, {} failed",
        sink.len(),
        sink.failures().len()
    );
}
