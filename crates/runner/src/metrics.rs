//! Prometheus textfile export.
//!
//! The runner has no HTTP surface, so metrics are written in text exposition
//! format for the node-exporter textfile collector.

use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};
use tracing::warn;

use pipelines_core::{CycleReport, OrchestratorError};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Unix time of the last cycle that completed.
pub static LAST_SUCCESS_TIMESTAMP: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pipeline_last_success_timestamp_seconds",
        "Unix time of the last successful cycle",
    )
    .unwrap()
});

/// Jobs submitted by the most recent successful cycle.
pub static LAST_CYCLE_SUBMITTED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pipeline_last_cycle_submitted",
        "Jobs submitted by the last cycle",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    let runner: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(LAST_SUCCESS_TIMESTAMP.clone()),
        Box::new(LAST_CYCLE_SUBMITTED.clone()),
    ];

    for metric in runner.into_iter().chain(pipelines_core::metrics::all_metrics()) {
        if let Err(e) = registry.register(metric) {
            warn!("Failed to register metric: {}", e);
        }
    }
}

/// Update runner gauges from a cycle result.
pub fn observe_cycle(result: &Result<CycleReport, OrchestratorError>) {
    if let Ok(report) = result {
        LAST_SUCCESS_TIMESTAMP.set(unix_now_secs());
        LAST_CYCLE_SUBMITTED.set(report.submitted as i64);
    }
}

fn unix_now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not UTF-8")
}

/// Write the textfile, replacing the previous one atomically.
pub fn write_textfile(path: &Path) -> Result<()> {
    let body = encode_metrics()?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Metrics textfile path has no file name")?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    std::fs::write(&tmp, body).with_context(|| format!("Failed to write {:?}", tmp))?;
    std::fs::rename(&tmp, path).with_context(|| format!("Failed to move {:?} into place", tmp))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_core_metrics() {
        pipelines_core::metrics::MANIFESTS_CLAIMED.inc();
        LAST_SUCCESS_TIMESTAMP.set(1);

        let output = encode_metrics().unwrap();
        assert!(output.contains("pipeline_manifests_claimed_total"));
        assert!(output.contains("pipeline_last_success_timestamp_seconds"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_write_textfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.prom");

        observe_cycle(&Ok(CycleReport {
            submitted: 3,
            ..CycleReport::default()
        }));
        write_textfile(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("pipeline_last_cycle_submitted 3"));
        assert!(!dir.path().join(".pipeline.prom.tmp").exists());
    }
}
