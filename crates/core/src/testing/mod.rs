//! Testing utilities and in-memory collaborators.
//!
//! Provides fakes for every external trait the cycle driver consumes, so the
//! whole discovery → submission → reconciliation loop runs without a Tapis
//! tenant.
//!
//! # Example
//!
//! ```rust,ignore
//! use pipelines_core::testing::{fixtures, MockExecution, MockStorage};
//!
//! let storage = MockStorage::new();
//! storage.put_file("/outbox/tapis_pipeline_manifest_job42",
//!     fixtures::manifest_json(&["/outbox/a.txt"])).await;
//! storage.put_file("/outbox/a.txt", "hello").await;
//! ```

mod mock_execution;
mod mock_storage;
mod recording_relay;

pub use mock_execution::{MockExecution, RecordedSubmission};
pub use mock_storage::{MockStorage, StorageCall};
pub use recording_relay::RecordingRelay;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;

    use crate::config::{JobTargetConfig, OutboxConfig, PipelineIdentity};
    use crate::execution::{ExecutionPlatform, FileInput, JobRequest};
    use crate::metadata::MetadataStore;
    use crate::orchestrator::{CycleConfig, CycleContext};
    use crate::storage::RemoteStorage;

    pub const SYSTEM_ID: &str = "test.storage";
    pub const OUTBOX: &str = "/outbox";

    /// Identity for a pipeline named `word_stats` watching `/outbox`.
    pub fn identity() -> PipelineIdentity {
        PipelineIdentity {
            pipeline_name: "word_stats".to_string(),
            outbox: OutboxConfig::Tapis {
                system_id: SYSTEM_ID.to_string(),
                path: OUTBOX.to_string(),
            },
            target: JobTargetConfig::TapisApp {
                app_id: "word-stats".to_string(),
                app_version: "0.1".to_string(),
                manifest_input_name: "manifest".to_string(),
            },
        }
    }

    /// Cycle config with no retry backoff and a short call timeout.
    pub fn cycle_config() -> CycleConfig {
        CycleConfig {
            call_timeout_secs: 1,
            retry_backoff_ms: 0,
            ..CycleConfig::default()
        }
    }

    pub fn context(
        store: Arc<dyn MetadataStore>,
        storage: Arc<dyn RemoteStorage>,
        execution: Arc<dyn ExecutionPlatform>,
    ) -> CycleContext {
        CycleContext::new(identity(), cycle_config(), store, storage, execution)
    }

    /// Outbox path of the manifest for `remote_id`.
    pub fn manifest_path(remote_id: &str) -> String {
        format!("{}/tapis_pipeline_manifest_{}", OUTBOX, remote_id)
    }

    /// Manifest payload referencing `paths`, pretty-printed.
    pub fn manifest_json(paths: &[&str]) -> String {
        let files: Vec<serde_json::Value> = paths
            .iter()
            .map(|p| serde_json::json!({ "file_path": p }))
            .collect();
        serde_json::to_string_pretty(&serde_json::json!({ "files": files }))
            .unwrap_or_default()
    }

    /// A minimal job request.
    pub fn job_request(name: &str) -> JobRequest {
        JobRequest {
            name: name.to_string(),
            app_id: "word-stats".to_string(),
            app_version: "0.1".to_string(),
            file_inputs: vec![FileInput {
                name: Some("manifest".to_string()),
                source_url: format!("tapis://{}/outbox/m", SYSTEM_ID),
                target_path: None,
            }],
        }
    }
}
