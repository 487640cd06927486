//! Output relay that records what it was given.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::orchestrator::{CompletedJob, OutputRelay, RelayError};

/// Records every relayed job; can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingRelay {
    relayed: Arc<RwLock<Vec<CompletedJob>>>,
    fail_with: Arc<RwLock<Option<String>>>,
}

impl RecordingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn relayed(&self) -> Vec<CompletedJob> {
        self.relayed.read().await.clone()
    }

    /// Fail every relay with `message` until cleared with `None`.
    pub async fn set_failure(&self, message: Option<&str>) {
        *self.fail_with.write().await = message.map(str::to_string);
    }
}

#[async_trait]
impl OutputRelay for RecordingRelay {
    fn name(&self) -> &str {
        "recording"
    }

    async fn relay(&self, job: &CompletedJob) -> Result<(), RelayError> {
        if let Some(msg) = self.fail_with.read().await.clone() {
            return Err(RelayError::Failed(msg));
        }
        self.relayed.write().await.push(job.clone());
        Ok(())
    }
}
