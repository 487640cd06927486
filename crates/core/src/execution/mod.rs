//! Execution platform abstraction.
//!
//! This module provides an `ExecutionPlatform` trait for submitting jobs and
//! polling their status.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during execution platform operations.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job rejected: {0}")]
    Rejected(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// A file staged into the job's input directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInput {
    /// App input slot this binds to; `None` for ad hoc inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source_url: String,
    /// Path relative to the job input directory; `None` keeps the app default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
}

/// Request to run one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub name: String,
    pub app_id: String,
    pub app_version: String,
    pub file_inputs: Vec<FileInput>,
}

/// What the platform reported back for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub job_id: String,
    pub status: String,
}

/// Trait for execution platform backends.
#[async_trait]
pub trait ExecutionPlatform: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Submit a job.
    async fn submit(&self, request: &JobRequest) -> Result<JobSubmission, ExecutionError>;

    /// Current platform status string of a job.
    async fn poll(&self, job_id: &str) -> Result<String, ExecutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_request_serializes_camel_case() {
        let request = JobRequest {
            name: "word_stats.job42".to_string(),
            app_id: "word-stats".to_string(),
            app_version: "0.1".to_string(),
            file_inputs: vec![
                FileInput {
                    name: Some("manifest".to_string()),
                    source_url: "tapis://sys/outbox/m".to_string(),
                    target_path: None,
                },
                FileInput {
                    name: None,
                    source_url: "tapis://sys/outbox/a.txt".to_string(),
                    target_path: Some("outbox/a.txt".to_string()),
                },
            ],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["appId"], "word-stats");
        assert_eq!(json["appVersion"], "0.1");
        assert_eq!(json["fileInputs"][0]["name"], "manifest");
        assert!(json["fileInputs"][0].get("targetPath").is_none());
        assert!(json["fileInputs"][1].get("name").is_none());
        assert_eq!(json["fileInputs"][1]["targetPath"], "outbox/a.txt");
    }
}
