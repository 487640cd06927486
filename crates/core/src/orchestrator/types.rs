//! Types for the cycle driver and its components.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::execution::ExecutionError;
use crate::manifest::ManifestError;
use crate::metadata::{MetadataError, Status};
use crate::storage::StorageError;

/// Errors that abort a whole cycle.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The outbox could not be listed; nothing was claimed.
    #[error("outbox listing failed: {0}")]
    Discovery(#[from] StorageError),
}

/// Why a claimed manifest was rejected.
#[derive(Debug, Error)]
pub enum ValidationFailure {
    #[error("failed to fetch manifest {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("invalid manifest {path}: {source}")]
    Invalid {
        path: String,
        #[source]
        source: ManifestError,
    },

    #[error("input file {path} not found: {reason}")]
    MissingInput { path: String, reason: String },
}

impl ValidationFailure {
    /// Metric label for the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            ValidationFailure::Fetch { .. } => "fetch",
            ValidationFailure::Invalid { .. } => "parse",
            ValidationFailure::MissingInput { .. } => "missing_input",
        }
    }
}

/// Why a validated manifest did not end up in flight.
#[derive(Debug, Error)]
pub enum SubmissionFailure {
    /// The execution platform refused or could not be reached.
    #[error("job submission failed: {0}")]
    Platform(#[from] ExecutionError),

    /// The job was accepted but recording it failed.
    #[error("job {job_id} submitted but not recorded: {source}")]
    Record {
        job_id: String,
        #[source]
        source: MetadataError,
    },
}

/// A job that is out on the execution platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub remote_id: String,
    pub job_id: String,
    pub job_name: String,
    /// Initial status reported by the platform.
    pub status: String,
}

/// A job observed in a terminal status during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedJob {
    pub remote_id: String,
    pub job_id: String,
    pub status: Status,
}

/// Counts for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Manifests newly claimed by discovery.
    pub claimed: usize,
    /// Claimed manifests that passed validation.
    pub validated: usize,
    /// Jobs moved in flight.
    pub submitted: usize,
    /// Manifests moved to ERROR this cycle.
    pub failed: usize,
    /// Jobs observed in a terminal status.
    pub completed: usize,
    /// Completed jobs the output relay accepted.
    pub relayed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::Discovery(StorageError::Timeout);
        assert_eq!(err.to_string(), "outbox listing failed: Request timeout");

        let err = ValidationFailure::MissingInput {
            path: "/outbox/b.txt".to_string(),
            reason: "empty listing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "input file /outbox/b.txt not found: empty listing"
        );
        assert_eq!(err.stage(), "missing_input");
    }

    #[test]
    fn test_cycle_report_default() {
        let report = CycleReport::default();
        assert_eq!(report.claimed, 0);
        assert_eq!(report.relayed, 0);
    }

    #[test]
    fn test_completed_job_serialization() {
        let job = CompletedJob {
            remote_id: "job42".to_string(),
            job_id: "abc-007".to_string(),
            status: Status::Finished,
        };
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "FINISHED");
    }
}
