//! Cycle driver implementation.
//!
//! One cycle runs, in order:
//! - Discovery: claim new manifests (a listing failure aborts the cycle)
//! - Validate + submit: one unit per claimed manifest, bounded concurrency
//! - Reconciliation: poll the jobs that were in flight before this cycle's
//!   submissions, so a fresh job is first polled on the next cycle
//! - Relay: hand each completed job to the output relay

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::manifest::RemoteManifestEntry;
use crate::metrics;

use super::context::CycleContext;
use super::discovery::discover;
use super::reconciler::{in_flight, reconcile_records};
use super::relay::{OutputRelay, RelayError};
use super::submission::submit;
use super::types::{CompletedJob, CycleReport, OrchestratorError};
use super::validation::validate;

/// Outcome of one manifest's validate + submit unit.
enum UnitOutcome {
    Submitted,
    /// Validated but the submission failed.
    SubmitFailed,
    Invalid,
}

/// Drives manifests from the outbox through to completion.
///
/// Holds no state between cycles; everything is re-derived from the
/// metadata store.
pub struct CycleDriver {
    ctx: CycleContext,
    relay: Arc<dyn OutputRelay>,
    running: AtomicBool,
}

impl CycleDriver {
    pub fn new(ctx: CycleContext, relay: Arc<dyn OutputRelay>) -> Self {
        Self {
            ctx,
            relay,
            running: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> &CycleContext {
        &self.ctx
    }

    /// Run one full cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, OrchestratorError> {
        let mut report = CycleReport::default();

        let discovered = match discover(&self.ctx).await {
            Ok(discovered) => discovered,
            Err(e) => {
                metrics::CYCLES_TOTAL
                    .with_label_values(&["discovery_failed"])
                    .inc();
                return Err(e);
            }
        };
        report.claimed = discovered.len();

        let pending = in_flight(&self.ctx);

        let outcomes: Vec<UnitOutcome> = stream::iter(discovered)
            .map(|entry| self.process_manifest(entry))
            .buffer_unordered(self.ctx.config.max_concurrent.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                UnitOutcome::Submitted => {
                    report.validated += 1;
                    report.submitted += 1;
                }
                UnitOutcome::SubmitFailed => {
                    report.validated += 1;
                    report.failed += 1;
                }
                UnitOutcome::Invalid => report.failed += 1,
            }
        }

        let completed = reconcile_records(&self.ctx, pending).await;
        report.completed = completed.len();

        for job in &completed {
            match self.relay_one(job).await {
                Ok(()) => {
                    report.relayed += 1;
                    metrics::RELAYS_TOTAL.with_label_values(&["success"]).inc();
                }
                Err(e) => {
                    warn!(
                        remote_id = %job.remote_id,
                        job_id = %job.job_id,
                        relay = self.relay.name(),
                        error = %e,
                        "Output relay failed"
                    );
                    metrics::RELAYS_TOTAL.with_label_values(&["failed"]).inc();
                }
            }
        }

        metrics::CYCLES_TOTAL.with_label_values(&["success"]).inc();
        info!(
            claimed = report.claimed,
            submitted = report.submitted,
            failed = report.failed,
            completed = report.completed,
            relayed = report.relayed,
            "Cycle complete"
        );
        Ok(report)
    }

    /// Run cycles every `interval` until `shutdown` resolves.
    ///
    /// The first cycle starts immediately. A failed cycle is logged and the
    /// next tick tries again. `on_cycle` sees every cycle's result.
    pub async fn run_loop<S, F>(&self, interval: Duration, shutdown: S, mut on_cycle: F)
    where
        S: Future<Output = ()>,
        F: FnMut(&Result<CycleReport, OrchestratorError>),
    {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Cycle loop already running");
            return;
        }

        info!(interval_secs = interval.as_secs(), "Cycle loop started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Cycle loop received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    let result = self.run_cycle().await;
                    if let Err(e) = &result {
                        error!(error = %e, "Cycle failed, retrying next tick");
                    }
                    on_cycle(&result);
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Cycle loop stopped");
    }

    /// Validate then submit one manifest. Failures are already recorded in
    /// the metadata store by the step that failed.
    async fn process_manifest(&self, entry: RemoteManifestEntry) -> UnitOutcome {
        let manifest = match validate(&self.ctx, &entry).await {
            Ok(manifest) => manifest,
            Err(_) => return UnitOutcome::Invalid,
        };

        match submit(&self.ctx, &manifest).await {
            Ok(handle) => {
                debug!(remote_id = %handle.remote_id, job_id = %handle.job_id, "Manifest in flight");
                UnitOutcome::Submitted
            }
            Err(_) => UnitOutcome::SubmitFailed,
        }
    }

    async fn relay_one(&self, job: &CompletedJob) -> Result<(), RelayError> {
        self.ctx
            .bounded(self.relay.relay(job), || RelayError::Timeout)
            .await
    }
}
