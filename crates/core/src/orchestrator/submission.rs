//! Job submission for validated manifests.

use serde_json::json;
use tracing::{error, info, warn};

use crate::config::PipelineIdentity;
use crate::execution::{ExecutionError, FileInput, JobRequest};
use crate::manifest::Manifest;
use crate::metadata::Status;
use crate::metrics;

use super::context::CycleContext;
use super::types::{JobHandle, SubmissionFailure};

/// Build the job request for a manifest.
///
/// The manifest itself is bound to the target's manifest input; every file
/// it lists is staged under its own path.
pub fn build_job_request(identity: &PipelineIdentity, manifest: &Manifest) -> JobRequest {
    let outbox = &identity.outbox;

    let mut file_inputs = Vec::with_capacity(manifest.inputs.len() + 1);
    file_inputs.push(FileInput {
        name: Some(identity.target.manifest_input_name().to_string()),
        source_url: outbox.file_url(&manifest.source_path),
        target_path: None,
    });
    file_inputs.extend(manifest.inputs.iter().map(|input| FileInput {
        name: None,
        source_url: outbox.file_url(&input.file_path),
        target_path: Some(input.file_path.clone()),
    }));

    JobRequest {
        name: manifest.job_name.clone(),
        app_id: identity.target.app_id().to_string(),
        app_version: identity.target.app_version().to_string(),
        file_inputs,
    }
}

/// Submit a manifest's job and record the outcome.
///
/// Success moves the record in flight with the job id; failure moves it to
/// `ERROR`. Exactly one of the two is written.
pub async fn submit(ctx: &CycleContext, manifest: &Manifest) -> Result<JobHandle, SubmissionFailure> {
    let request = build_job_request(&ctx.identity, manifest);

    let submission = match ctx
        .bounded(ctx.execution.submit(&request), || ExecutionError::Timeout)
        .await
    {
        Ok(submission) => submission,
        Err(e) => {
            warn!(remote_id = %manifest.remote_id, error = %e, "Job submission failed");
            metrics::SUBMISSIONS_TOTAL.with_label_values(&["failed"]).inc();
            record_error(ctx, &manifest.remote_id, json!({ "debug_data": e.to_string() }));
            return Err(SubmissionFailure::Platform(e));
        }
    };

    let info = json!({
        "job_id": submission.job_id,
        "job_status": submission.status,
        "job_name": request.name,
    });

    if let Err(e) = ctx
        .store
        .update(&manifest.remote_id, Status::JobSubmitted, info)
    {
        error!(
            remote_id = %manifest.remote_id,
            job_id = %submission.job_id,
            error = %e,
            "Job submitted but could not be recorded"
        );
        metrics::SUBMISSIONS_TOTAL.with_label_values(&["failed"]).inc();
        record_error(
            ctx,
            &manifest.remote_id,
            json!({
                "debug_data": format!("submitted but not recorded: {}", e),
                "job_id": submission.job_id,
            }),
        );
        return Err(SubmissionFailure::Record {
            job_id: submission.job_id,
            source: e,
        });
    }

    info!(
        remote_id = %manifest.remote_id,
        job_id = %submission.job_id,
        job_name = %request.name,
        status = %submission.status,
        "Job submitted"
    );
    metrics::SUBMISSIONS_TOTAL.with_label_values(&["success"]).inc();

    Ok(JobHandle {
        remote_id: manifest.remote_id.clone(),
        job_id: submission.job_id,
        job_name: request.name,
        status: submission.status,
    })
}

fn record_error(ctx: &CycleContext, remote_id: &str, info: serde_json::Value) {
    if let Err(e) = ctx.store.update(remote_id, Status::Error, info) {
        error!(remote_id = %remote_id, error = %e, "Failed to record submission failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::manifest::{parse_manifest_bytes, RemoteManifestEntry};
    use crate::metadata::{MetadataRecord, MetadataStore, SqliteMetadataStore};
    use crate::testing::{fixtures, MockExecution, MockStorage};

    fn manifest(remote_id: &str, paths: &[&str]) -> Manifest {
        let entry = RemoteManifestEntry {
            remote_id: remote_id.to_string(),
            name: format!("tapis_pipeline_manifest_{}", remote_id),
            path: fixtures::manifest_path(remote_id),
            uri: String::new(),
        };
        let raw = parse_manifest_bytes(fixtures::manifest_json(paths).as_bytes()).unwrap();
        Manifest::new("word_stats", &entry, raw)
    }

    fn setup(remote_id: &str) -> (CycleContext, Arc<MockExecution>, Arc<SqliteMetadataStore>) {
        let store = Arc::new(SqliteMetadataStore::in_memory().unwrap());
        store.create_if_absent(&MetadataRecord::new_init(remote_id)).unwrap();
        let execution = Arc::new(MockExecution::new());
        let ctx = fixtures::context(store.clone(), Arc::new(MockStorage::new()), execution.clone());
        (ctx, execution, store)
    }

    #[test]
    fn test_build_job_request() {
        let request = build_job_request(
            &fixtures::identity(),
            &manifest("job42", &["/outbox/a.txt", "/outbox/b.txt"]),
        );

        assert_eq!(request.name, "word_stats.job42");
        assert_eq!(request.app_id, "word-stats");
        assert_eq!(request.app_version, "0.1");
        assert_eq!(request.file_inputs.len(), 3);

        let primary = &request.file_inputs[0];
        assert_eq!(primary.name.as_deref(), Some("manifest"));
        assert_eq!(
            primary.source_url,
            "tapis://test.storage/outbox/tapis_pipeline_manifest_job42"
        );
        assert!(primary.target_path.is_none());

        let second = &request.file_inputs[2];
        assert!(second.name.is_none());
        assert_eq!(second.source_url, "tapis://test.storage/outbox/b.txt");
        assert_eq!(second.target_path.as_deref(), Some("/outbox/b.txt"));
    }

    #[tokio::test]
    async fn test_submit_records_job_in_flight() {
        let (ctx, execution, store) = setup("job42");

        let handle = submit(&ctx, &manifest("job42", &["/outbox/a.txt"])).await.unwrap();
        assert_eq!(handle.remote_id, "job42");
        assert_eq!(handle.status, "PENDING");

        let record = store.get("job42").unwrap().unwrap();
        assert_eq!(record.status(), &Status::JobSubmitted);
        assert_eq!(record.job_id(), Some(handle.job_id.as_str()));
        assert_eq!(record.current.additional_info["job_status"], "PENDING");
        assert_eq!(record.current.additional_info["job_name"], "word_stats.job42");
        assert_eq!(record.history.len(), 1);

        let submitted = execution.submitted().await;
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].job_id, handle.job_id);
    }

    #[tokio::test]
    async fn test_submit_failure_records_error() {
        let (ctx, execution, store) = setup("job5");
        execution
            .set_next_submit_error(ExecutionError::Rejected("app not found".into()))
            .await;

        let failure = submit(&ctx, &manifest("job5", &[])).await.unwrap_err();
        assert!(matches!(
            failure,
            SubmissionFailure::Platform(ExecutionError::Rejected(_))
        ));

        let record = store.get("job5").unwrap().unwrap();
        assert_eq!(record.status(), &Status::Error);
        assert!(record.job_id().is_none());
        assert!(record.current.additional_info["debug_data"]
            .as_str()
            .unwrap()
            .contains("app not found"));
        assert_eq!(record.history.len(), 1);
    }

    #[tokio::test]
    async fn test_unrecorded_submission_is_reported() {
        // No record was claimed, so the in-flight write fails.
        let store = Arc::new(SqliteMetadataStore::in_memory().unwrap());
        let execution = Arc::new(MockExecution::new());
        let ctx = fixtures::context(store.clone(), Arc::new(MockStorage::new()), execution.clone());

        let failure = submit(&ctx, &manifest("ghost", &[])).await.unwrap_err();
        assert!(matches!(failure, SubmissionFailure::Record { .. }));
        assert_eq!(execution.submitted().await.len(), 1);
        assert!(store.get("ghost").unwrap().is_none());
    }
}
