//! Collaborators shared by every step of a cycle.

use std::future::Future;
use std::sync::Arc;

use crate::config::PipelineIdentity;
use crate::execution::ExecutionPlatform;
use crate::metadata::MetadataStore;
use crate::storage::RemoteStorage;

use super::config::CycleConfig;

/// Everything a cycle step needs. Cheap to clone.
#[derive(Clone)]
pub struct CycleContext {
    pub identity: PipelineIdentity,
    pub config: CycleConfig,
    pub store: Arc<dyn MetadataStore>,
    pub storage: Arc<dyn RemoteStorage>,
    pub execution: Arc<dyn ExecutionPlatform>,
}

impl CycleContext {
    pub fn new(
        identity: PipelineIdentity,
        config: CycleConfig,
        store: Arc<dyn MetadataStore>,
        storage: Arc<dyn RemoteStorage>,
        execution: Arc<dyn ExecutionPlatform>,
    ) -> Self {
        Self {
            identity,
            config,
            store,
            storage,
            execution,
        }
    }

    /// Run an external call under the configured call timeout.
    /// An elapsed timeout becomes `on_timeout()`.
    pub async fn bounded<T, E, F>(&self, call: F, on_timeout: impl FnOnce() -> E) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.config.call_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout()),
        }
    }
}
