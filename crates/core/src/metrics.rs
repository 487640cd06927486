//! Prometheus metrics for the cycle driver and its components.
//!
//! Counters only; the binary registers them via `all_metrics()` and exports
//! them as a textfile after each cycle.

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts};

// =============================================================================
// Cycle
// =============================================================================

/// Cycles run total by result.
pub static CYCLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pipeline_cycles_total", "Total orchestration cycles run"),
        &["result"], // "success", "discovery_failed"
    )
    .unwrap()
});

// =============================================================================
// Manifests
// =============================================================================

/// Manifests newly claimed by discovery.
pub static MANIFESTS_CLAIMED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pipeline_manifests_claimed_total",
        "Total manifests claimed by discovery",
    )
    .unwrap()
});

/// Validation failures total by stage.
pub static VALIDATION_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pipeline_validation_failures_total",
            "Total manifests that failed validation",
        ),
        &["stage"], // "fetch", "parse", "missing_input"
    )
    .unwrap()
});

/// Fetch retries total.
pub static FETCH_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pipeline_fetch_retries_total",
        "Total manifest fetch retries",
    )
    .unwrap()
});

// =============================================================================
// Jobs
// =============================================================================

/// Job submissions total by result.
pub static SUBMISSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pipeline_submissions_total", "Total job submissions"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Jobs reconciled into a terminal status.
pub static RECONCILIATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pipeline_reconciliations_total",
            "Total jobs observed in a terminal status",
        ),
        &["status"],
    )
    .unwrap()
});

/// Status polls that failed or timed out.
pub static POLL_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pipeline_poll_failures_total",
        "Total job status polls that failed",
    )
    .unwrap()
});

/// Output relay outcomes.
pub static RELAYS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pipeline_relays_total", "Total output relay attempts"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CYCLES_TOTAL.clone()),
        Box::new(MANIFESTS_CLAIMED.clone()),
        Box::new(VALIDATION_FAILURES.clone()),
        Box::new(FETCH_RETRIES.clone()),
        Box::new(SUBMISSIONS_TOTAL.clone()),
        Box::new(RECONCILIATIONS_TOTAL.clone()),
        Box::new(POLL_FAILURES.clone()),
        Box::new(RELAYS_TOTAL.clone()),
    ]
}
