//! Manifest validation: fetch, parse, and cross-check referenced inputs.

use serde_json::json;
use tracing::{debug, error, warn};

use crate::manifest::{parse_manifest_bytes, Manifest, RemoteManifestEntry};
use crate::metadata::Status;
use crate::metrics;
use crate::storage::StorageError;

use super::context::CycleContext;
use super::types::ValidationFailure;

/// Validate a claimed manifest.
///
/// On failure the manifest's record is moved to `ERROR` with the diagnostic
/// under `debug_data`, and no `Manifest` is produced.
pub async fn validate(
    ctx: &CycleContext,
    entry: &RemoteManifestEntry,
) -> Result<Manifest, ValidationFailure> {
    match check(ctx, entry).await {
        Ok(manifest) => {
            debug!(
                remote_id = %entry.remote_id,
                inputs = manifest.inputs.len(),
                "Manifest validated"
            );
            Ok(manifest)
        }
        Err(failure) => {
            warn!(remote_id = %entry.remote_id, error = %failure, "Manifest rejected");
            metrics::VALIDATION_FAILURES
                .with_label_values(&[failure.stage()])
                .inc();

            if let Err(e) = ctx.store.update(
                &entry.remote_id,
                Status::Error,
                json!({ "debug_data": failure.to_string() }),
            ) {
                error!(
                    remote_id = %entry.remote_id,
                    error = %e,
                    "Failed to record validation failure"
                );
            }
            Err(failure)
        }
    }
}

async fn check(
    ctx: &CycleContext,
    entry: &RemoteManifestEntry,
) -> Result<Manifest, ValidationFailure> {
    let bytes = fetch_with_retry(ctx, &entry.path)
        .await
        .map_err(|source| ValidationFailure::Fetch {
            path: entry.path.clone(),
            source,
        })?;

    let raw = parse_manifest_bytes(&bytes).map_err(|source| ValidationFailure::Invalid {
        path: entry.path.clone(),
        source,
    })?;

    for path in raw.file_paths() {
        ensure_input_exists(ctx, path).await?;
    }

    Ok(Manifest::new(&ctx.identity.pipeline_name, entry, raw))
}

/// Fetch with a bounded number of attempts and a fixed backoff.
/// Only transient storage errors are retried.
async fn fetch_with_retry(ctx: &CycleContext, path: &str) -> Result<Vec<u8>, StorageError> {
    let storage_id = ctx.identity.outbox.storage_id();
    let attempts = ctx.config.fetch_attempts.max(1);
    let mut attempt = 1;

    loop {
        match ctx
            .bounded(ctx.storage.fetch(storage_id, path), || StorageError::Timeout)
            .await
        {
            Ok(bytes) => return Ok(bytes),
            Err(e) if e.is_retryable() && attempt < attempts => {
                warn!(
                    path = %path,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Manifest fetch failed, retrying"
                );
                metrics::FETCH_RETRIES.inc();
                attempt += 1;
                tokio::time::sleep(ctx.config.retry_backoff()).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn ensure_input_exists(ctx: &CycleContext, path: &str) -> Result<(), ValidationFailure> {
    let storage_id = ctx.identity.outbox.storage_id();
    let listing = ctx
        .bounded(ctx.storage.list(storage_id, path), || StorageError::Timeout)
        .await;

    match listing {
        Ok(entries) if !entries.is_empty() => Ok(()),
        Ok(_) => Err(ValidationFailure::MissingInput {
            path: path.to_string(),
            reason: "empty listing".to_string(),
        }),
        Err(e) => Err(ValidationFailure::MissingInput {
            path: path.to_string(),
            reason: e.to_string(),
        }),
    }
}
