//! Metadata storage trait and errors.

use serde_json::Value;
use thiserror::Error;

use super::{MetadataRecord, Status};

/// Error type for metadata operations.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// No record exists for this remote id.
    #[error("metadata record not found: {0}")]
    NotFound(String),

    /// A stored row could not be decoded.
    #[error("corrupt metadata record {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// Database error.
    #[error("database error: {0}")]
    Database(String),

    #[error("metadata store lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for MetadataError {
    fn from(e: rusqlite::Error) -> Self {
        MetadataError::Database(e.to_string())
    }
}

/// Durable per-remote-id status records.
///
/// Implementations must make `create_if_absent` atomic and `update` a single
/// read-modify-write per id; the orchestrator relies on both when units run
/// concurrently.
pub trait MetadataStore: Send + Sync {
    /// Insert `record` unless one with the same name exists.
    /// Returns `true` if this call created it.
    fn create_if_absent(&self, record: &MetadataRecord) -> Result<bool, MetadataError>;

    /// Get a record by remote id.
    fn get(&self, name: &str) -> Result<Option<MetadataRecord>, MetadataError>;

    /// Transition a record to `status`, pushing the previous current entry
    /// onto its history.
    fn update(
        &self,
        name: &str,
        status: Status,
        additional_info: Value,
    ) -> Result<MetadataRecord, MetadataError>;

    /// All records whose current status is `status`, oldest first.
    fn list_by_status(&self, status: &Status) -> Result<Vec<MetadataRecord>, MetadataError>;
}
