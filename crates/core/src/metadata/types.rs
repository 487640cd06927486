//! Metadata record and status types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a remote manifest.
///
/// Persisted as its code string. Execution-platform states that have no
/// dedicated variant are carried verbatim in `Platform`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Status {
    /// Claimed by discovery; nothing else has happened yet.
    Init,
    /// A job was submitted and has not been observed in a terminal state.
    JobSubmitted,
    Finished,
    Failed,
    /// Validation or submission failed; needs an operator.
    Error,
    /// Any other platform-reported status.
    Platform(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Init => "METADATA_CREATED",
            Status::JobSubmitted => "JOB_SUBMITTED_TO_TAPIS",
            Status::Finished => "FINISHED",
            Status::Failed => "FAILED",
            Status::Error => "ERROR",
            Status::Platform(code) => code,
        }
    }

    /// Parse a persisted or platform-reported status code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "METADATA_CREATED" => Status::Init,
            "JOB_SUBMITTED_TO_TAPIS" => Status::JobSubmitted,
            "FINISHED" => Status::Finished,
            "FAILED" => Status::Failed,
            "ERROR" => Status::Error,
            other => Status::Platform(other.to_string()),
        }
    }

    /// Human-readable description for dashboards and logs.
    pub fn description(&self) -> String {
        match self {
            Status::Init => "Metadata created".to_string(),
            Status::JobSubmitted => "Job submitted to execution platform".to_string(),
            Status::Finished => "Job finished".to_string(),
            Status::Failed => "Job failed".to_string(),
            Status::Error => "Pipeline error".to_string(),
            Status::Platform(code) => format!("Platform status {}", code),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_str().to_string()
    }
}

impl From<String> for Status {
    fn from(code: String) -> Self {
        Status::from_code(&code)
    }
}

// ============================================================================
// Records
// ============================================================================

/// One point in a record's status timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: Status,
    pub updated_at: DateTime<Utc>,
    /// Free-form context: job ids, diagnostics.
    #[serde(default)]
    pub additional_info: Value,
}

/// Durable state for one remote id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// The remote id this record tracks.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub current: StatusEntry,
    /// Prior `current` values, oldest first.
    pub history: Vec<StatusEntry>,
}

impl MetadataRecord {
    /// A fresh record in `Init` with empty history.
    pub fn new_init(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: now,
            current: StatusEntry {
                status: Status::Init,
                updated_at: now,
                additional_info: Value::String(String::new()),
            },
            history: Vec::new(),
        }
    }

    /// Apply a status transition: the current entry moves to the end of
    /// history and the new entry replaces it.
    pub fn transition(&mut self, status: Status, additional_info: Value, at: DateTime<Utc>) {
        let next = StatusEntry {
            status,
            updated_at: at,
            additional_info,
        };
        let previous = std::mem::replace(&mut self.current, next);
        self.history.push(previous);
    }

    pub fn status(&self) -> &Status {
        &self.current.status
    }

    /// Execution-platform job id recorded at submission, if any.
    pub fn job_id(&self) -> Option<&str> {
        self.current
            .additional_info
            .get("job_id")
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_codes_round_trip() {
        for status in [
            Status::Init,
            Status::JobSubmitted,
            Status::Finished,
            Status::Failed,
            Status::Error,
        ] {
            assert_eq!(Status::from_code(status.as_str()), status);
        }
    }

    #[test]
    fn test_platform_status_passes_through() {
        let status = Status::from_code("CANCELLED");
        assert_eq!(status, Status::Platform("CANCELLED".to_string()));
        assert_eq!(status.as_str(), "CANCELLED");
        assert_eq!(status.description(), "Platform status CANCELLED");
    }

    #[test]
    fn test_status_serializes_as_code() {
        assert_eq!(
            serde_json::to_string(&Status::JobSubmitted).unwrap(),
            "\"JOB_SUBMITTED_TO_TAPIS\""
        );
        let parsed: Status = serde_json::from_str("\"FINISHED\"").unwrap();
        assert_eq!(parsed, Status::Finished);
    }

    #[test]
    fn test_new_record_is_init() {
        let record = MetadataRecord::new_init("job42");
        assert_eq!(record.name, "job42");
        assert_eq!(record.status(), &Status::Init);
        assert!(record.history.is_empty());
        assert!(record.job_id().is_none());
    }

    #[test]
    fn test_history_is_append_only() {
        let mut record = MetadataRecord::new_init("job42");
        let statuses = [
            Status::JobSubmitted,
            Status::Platform("RUNNING".to_string()),
            Status::Finished,
        ];

        for (i, status) in statuses.iter().enumerate() {
            let before = record.history.clone();
            record.transition(status.clone(), json!({ "step": i }), Utc::now());

            // Prior history is an untouched prefix
            assert_eq!(&record.history[..before.len()], before.as_slice());
            assert_eq!(record.history.len(), before.len() + 1);
        }

        // N = 4 states total (init + 3 transitions) -> history of 3
        assert_eq!(record.history.len(), 3);
        assert_eq!(record.status(), &Status::Finished);
        assert_eq!(record.history[0].status, Status::Init);
        assert_eq!(record.history[2].status, Status::Platform("RUNNING".to_string()));
    }

    #[test]
    fn test_job_id_from_additional_info() {
        let mut record = MetadataRecord::new_init("job42");
        record.transition(
            Status::JobSubmitted,
            json!({ "job_id": "uuid-1", "job_status": "PENDING" }),
            Utc::now(),
        );
        assert_eq!(record.job_id(), Some("uuid-1"));
    }
}
