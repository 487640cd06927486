pub mod config;
pub mod execution;
pub mod manifest;
pub mod metadata;
pub mod metrics;
pub mod orchestrator;
pub mod storage;
pub mod tapis;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, ConfigError, JobTargetConfig,
    OutboxConfig, PipelineConfig, PipelineIdentity, SanitizedConfig,
};
pub use execution::{ExecutionError, ExecutionPlatform, FileInput, JobRequest, JobSubmission};
pub use manifest::{
    job_name, remote_id_from_name, InputDescriptor, Manifest, ManifestError, RemoteManifestEntry,
};
pub use metadata::{
    MetadataError, MetadataRecord, MetadataStore, SqliteMetadataStore, Status, StatusEntry,
};
pub use orchestrator::{
    CompletedJob, CycleConfig, CycleContext, CycleDriver, CycleReport, JobHandle, LoggingRelay,
    OrchestratorError, OutputRelay, RelayError, SubmissionFailure, ValidationFailure,
};
pub use storage::{RemoteEntry, RemoteStorage, StorageError};
pub use tapis::{TapisClient, TapisError, TapisFiles, TapisJobs};
