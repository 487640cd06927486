//! Manifest domain types, naming rules and schema validation.

mod naming;
mod schema;

pub use naming::{
    is_manifest_name, job_name, remote_id_from_name, MANIFEST_PREFIX, MAX_JOB_NAME_LEN,
};
pub use schema::{parse_manifest_bytes, validate_manifest_value};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from decoding or validating a manifest payload.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest is not valid UTF-8: {0}")]
    InvalidEncoding(String),

    #[error("manifest is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("manifest does not match schema: {0}")]
    Schema(String),
}

/// A manifest found in the outbox listing, with its derived remote id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteManifestEntry {
    pub remote_id: String,
    /// File name in the outbox.
    pub name: String,
    /// Path on the storage system.
    pub path: String,
    /// Opaque platform URI.
    pub uri: String,
}

/// One input file referenced by a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub file_path: String,
    /// Any other keys the producer attached to the entry.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Manifest payload as decoded, before it is bound to a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawManifest {
    pub files: Vec<InputDescriptor>,
}

/// A fully validated manifest, ready for submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub pipeline_name: String,
    pub remote_id: String,
    /// Path of the manifest file itself on the outbox system.
    pub source_path: String,
    pub job_name: String,
    pub inputs: Vec<InputDescriptor>,
}

impl Manifest {
    /// Bind a validated payload to its pipeline and outbox entry.
    pub fn new(pipeline_name: &str, entry: &RemoteManifestEntry, raw: RawManifest) -> Self {
        Self {
            pipeline_name: pipeline_name.to_string(),
            remote_id: entry.remote_id.clone(),
            source_path: entry.path.clone(),
            job_name: job_name(pipeline_name, &entry.remote_id),
            inputs: raw.files,
        }
    }
}
