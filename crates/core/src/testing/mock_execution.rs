//! Mock execution platform for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::execution::{ExecutionError, ExecutionPlatform, JobRequest, JobSubmission};

/// A recorded job submission for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    pub request: JobRequest,
    pub job_id: String,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Mock implementation of the ExecutionPlatform trait.
///
/// Accepted jobs get a v4 uuid and start in `PENDING` (see
/// `set_initial_status`). Tests drive them forward with `set_status`.
///
/// # Example
///
/// ```rust,ignore
/// let platform = MockExecution::new();
/// let submission = platform.submit(&request).await?;
/// platform.set_status(&submission.job_id, "FINISHED").await;
/// assert_eq!(platform.poll(&submission.job_id).await?, "FINISHED");
/// ```
#[derive(Debug)]
pub struct MockExecution {
    submitted: Arc<RwLock<Vec<RecordedSubmission>>>,
    statuses: Arc<RwLock<HashMap<String, String>>>,
    /// If set, the next submit fails with this error.
    next_submit_error: Arc<RwLock<Option<ExecutionError>>>,
    /// Job ids whose polls fail.
    poll_failures: Arc<RwLock<HashMap<String, String>>>,
    poll_count: Arc<RwLock<usize>>,
    /// Status reported for newly accepted jobs.
    initial_status: Arc<RwLock<String>>,
    /// Artificial latency before every submit and poll response.
    delay: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockExecution {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecution {
    pub fn new() -> Self {
        Self {
            submitted: Arc::new(RwLock::new(Vec::new())),
            statuses: Arc::new(RwLock::new(HashMap::new())),
            next_submit_error: Arc::new(RwLock::new(None)),
            poll_failures: Arc::new(RwLock::new(HashMap::new())),
            poll_count: Arc::new(RwLock::new(0)),
            initial_status: Arc::new(RwLock::new("PENDING".to_string())),
            delay: Arc::new(RwLock::new(None)),
        }
    }

    /// All accepted submissions.
    pub async fn submitted(&self) -> Vec<RecordedSubmission> {
        self.submitted.read().await.clone()
    }

    /// Set the status a job reports on the next poll.
    pub async fn set_status(&self, job_id: &str, status: &str) {
        self.statuses
            .write()
            .await
            .insert(job_id.to_string(), status.to_string());
    }

    /// Make the next submit fail.
    pub async fn set_next_submit_error(&self, error: ExecutionError) {
        *self.next_submit_error.write().await = Some(error);
    }

    /// Make polls for `job_id` fail with a connection error until cleared.
    pub async fn fail_polls(&self, job_id: &str, message: &str) {
        self.poll_failures
            .write()
            .await
            .insert(job_id.to_string(), message.to_string());
    }

    pub async fn clear_poll_failures(&self) {
        self.poll_failures.write().await.clear();
    }

    pub async fn poll_count(&self) -> usize {
        *self.poll_count.read().await
    }

    /// Status new jobs start in, e.g. `FINISHED` for jobs that complete at once.
    pub async fn set_initial_status(&self, status: &str) {
        *self.initial_status.write().await = status.to_string();
    }

    /// Delay every submit and poll, e.g. to trip call timeouts.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().await = delay;
    }

    async fn pause(&self) {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ExecutionPlatform for MockExecution {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, request: &JobRequest) -> Result<JobSubmission, ExecutionError> {
        self.pause().await;
        if let Some(error) = self.next_submit_error.write().await.take() {
            return Err(error);
        }

        let job_id = uuid::Uuid::new_v4().to_string();
        let status = self.initial_status.read().await.clone();
        self.statuses
            .write()
            .await
            .insert(job_id.clone(), status.clone());
        self.submitted.write().await.push(RecordedSubmission {
            request: request.clone(),
            job_id: job_id.clone(),
            timestamp: Utc::now(),
        });

        Ok(JobSubmission { job_id, status })
    }

    async fn poll(&self, job_id: &str) -> Result<String, ExecutionError> {
        *self.poll_count.write().await += 1;
        self.pause().await;

        if let Some(msg) = self.poll_failures.read().await.get(job_id) {
            return Err(ExecutionError::ConnectionFailed(msg.clone()));
        }

        self.statuses
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| ExecutionError::JobNotFound(job_id.to_string()))
    }
}
