//! Remote storage abstraction.
//!
//! This module provides a `RemoteStorage` trait for listing and fetching files
//! on the platform hosting the remote outbox.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during remote storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

impl StorageError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::ConnectionFailed(_) | StorageError::ApiError(_) | StorageError::Timeout
        )
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    /// Opaque platform URI for the entry.
    pub uri: String,
}

/// Trait for remote storage backends.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// List entries at `path` on storage system `storage_id`.
    /// Listing a file path yields that single file.
    async fn list(&self, storage_id: &str, path: &str) -> Result<Vec<RemoteEntry>, StorageError>;

    /// Fetch the raw contents of a file.
    async fn fetch(&self, storage_id: &str, path: &str) -> Result<Vec<u8>, StorageError>;
}
