//! Output relay: the last step for a completed job.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use super::types::CompletedJob;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay failed: {0}")]
    Failed(String),

    #[error("relay timed out")]
    Timeout,
}

/// Moves a completed job's outputs to their destination.
#[async_trait]
pub trait OutputRelay: Send + Sync {
    fn name(&self) -> &str;

    async fn relay(&self, job: &CompletedJob) -> Result<(), RelayError>;
}

/// Relay that only records the completion in the log.
#[derive(Debug, Default, Clone)]
pub struct LoggingRelay;

#[async_trait]
impl OutputRelay for LoggingRelay {
    fn name(&self) -> &str {
        "logging"
    }

    async fn relay(&self, job: &CompletedJob) -> Result<(), RelayError> {
        info!(
            remote_id = %job.remote_id,
            job_id = %job.job_id,
            status = %job.status,
            "Job complete; outputs left in place"
        );
        Ok(())
    }
}
