//! Tapis Jobs API binding.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::client::TapisClient;
use crate::execution::{ExecutionError, ExecutionPlatform, JobRequest, JobSubmission};

#[derive(Debug, Deserialize)]
struct SubmitResult {
    uuid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    status: String,
}

/// `ExecutionPlatform` backed by the Tapis Jobs service.
pub struct TapisJobs {
    client: TapisClient,
}

impl TapisJobs {
    pub fn new(client: TapisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExecutionPlatform for TapisJobs {
    fn name(&self) -> &str {
        "tapis-jobs"
    }

    async fn submit(&self, request: &JobRequest) -> Result<JobSubmission, ExecutionError> {
        let url = self.client.endpoint("v3/jobs/submit");
        debug!(job_name = %request.name, app_id = %request.app_id, "Submitting job");

        let result: SubmitResult = self
            .client
            .send_json(self.client.post(&url).json(request))
            .await?;

        if result.uuid.is_empty() {
            return Err(ExecutionError::InvalidResponse(
                "submission returned an empty job id".to_string(),
            ));
        }

        info!(job_id = %result.uuid, job_name = %request.name, "Job accepted");
        Ok(JobSubmission {
            job_id: result.uuid,
            status: result.status.unwrap_or_else(|| "PENDING".to_string()),
        })
    }

    async fn poll(&self, job_id: &str) -> Result<String, ExecutionError> {
        let url = format!("{}/status", self.client.url("v3/jobs", job_id));
        let result: StatusResult = self.client.send_json(self.client.get(&url)).await?;
        Ok(result.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_result_decodes() {
        let result: SubmitResult =
            serde_json::from_str(r#"{"uuid": "abc-123-007", "status": "PENDING", "name": "x"}"#)
                .unwrap();
        assert_eq!(result.uuid, "abc-123-007");
        assert_eq!(result.status.as_deref(), Some("PENDING"));

        let result: SubmitResult = serde_json::from_str(r#"{"uuid": "abc"}"#).unwrap();
        assert!(result.status.is_none());
    }

    #[test]
    fn test_status_result_decodes() {
        let result: StatusResult = serde_json::from_str(r#"{"status": "RUNNING"}"#).unwrap();
        assert_eq!(result.status, "RUNNING");
    }
}
