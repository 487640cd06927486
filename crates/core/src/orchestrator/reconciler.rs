//! Completion reconciliation for in-flight jobs.

use futures::stream::{self, StreamExt};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::execution::ExecutionError;
use crate::metadata::{MetadataRecord, Status};
use crate::metrics;

use super::context::CycleContext;
use super::types::CompletedJob;

/// Poll every in-flight job and move the ones that reached a terminal
/// status.
///
/// The in-flight set is read fresh from the store on every call. Poll
/// failures and non-terminal statuses leave records untouched for the next
/// cycle.
pub async fn reconcile(ctx: &CycleContext) -> Vec<CompletedJob> {
    let records = in_flight(ctx);
    reconcile_records(ctx, records).await
}

/// Snapshot the records currently in flight.
///
/// A store failure yields an empty snapshot, which skips reconciliation for
/// this cycle only.
pub fn in_flight(ctx: &CycleContext) -> Vec<MetadataRecord> {
    match ctx.store.list_by_status(&Status::JobSubmitted) {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "Failed to list in-flight jobs");
            Vec::new()
        }
    }
}

/// Poll the jobs in a previously taken snapshot.
pub async fn reconcile_records(
    ctx: &CycleContext,
    records: Vec<MetadataRecord>,
) -> Vec<CompletedJob> {
    if records.is_empty() {
        return Vec::new();
    }
    debug!(in_flight = records.len(), "Reconciling jobs");

    stream::iter(records)
        .map(|record| reconcile_one(ctx, record))
        .buffer_unordered(ctx.config.max_concurrent.max(1))
        .filter_map(|completed| async move { completed })
        .collect()
        .await
}

async fn reconcile_one(ctx: &CycleContext, record: MetadataRecord) -> Option<CompletedJob> {
    let Some(job_id) = record.job_id().map(str::to_string) else {
        warn!(remote_id = %record.name, "In-flight record has no job id");
        if let Err(e) = ctx.store.update(
            &record.name,
            Status::Error,
            json!({ "debug_data": "in-flight record has no job_id" }),
        ) {
            error!(remote_id = %record.name, error = %e, "Failed to record error");
        }
        return None;
    };

    let status = match ctx
        .bounded(ctx.execution.poll(&job_id), || ExecutionError::Timeout)
        .await
    {
        Ok(status) => status,
        Err(e) => {
            warn!(remote_id = %record.name, job_id = %job_id, error = %e, "Job status poll failed");
            metrics::POLL_FAILURES.inc();
            return None;
        }
    };

    if !ctx.config.is_terminal(&status) {
        debug!(remote_id = %record.name, job_id = %job_id, status = %status, "Job still running");
        return None;
    }

    let terminal = Status::from_code(&status);
    let info = json!({ "job_id": job_id, "job_status": status });
    if let Err(e) = ctx.store.update(&record.name, terminal.clone(), info) {
        error!(
            remote_id = %record.name,
            job_id = %job_id,
            error = %e,
            "Failed to record terminal status"
        );
        return None;
    }

    info!(
        remote_id = %record.name,
        job_id = %job_id,
        status = %terminal,
        description = %terminal.description(),
        "Job reached terminal status"
    );
    metrics::RECONCILIATIONS_TOTAL
        .with_label_values(&[terminal.as_str()])
        .inc();

    Some(CompletedJob {
        remote_id: record.name,
        job_id,
        status: terminal,
    })
}
