//! Tapis Files API binding.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::client::TapisClient;
use crate::storage::{RemoteEntry, RemoteStorage, StorageError};

/// File listing entry as returned by `GET /v3/files/ops`.
#[derive(Debug, Deserialize)]
struct FileInfo {
    name: String,
    path: String,
    #[serde(default)]
    url: Option<String>,
}

/// `RemoteStorage` backed by Tapis systems.
pub struct TapisFiles {
    client: TapisClient,
}

impl TapisFiles {
    pub fn new(client: TapisClient) -> Self {
        Self { client }
    }
}

fn to_entry(storage_id: &str, info: FileInfo) -> RemoteEntry {
    let uri = info.url.unwrap_or_else(|| {
        format!("tapis://{}/{}", storage_id, info.path.trim_start_matches('/'))
    });
    RemoteEntry {
        name: info.name,
        path: info.path,
        uri,
    }
}

#[async_trait]
impl RemoteStorage for TapisFiles {
    fn name(&self) -> &str {
        "tapis-files"
    }

    async fn list(&self, storage_id: &str, path: &str) -> Result<Vec<RemoteEntry>, StorageError> {
        let url = self
            .client
            .url(&format!("v3/files/ops/{}", urlencoding::encode(storage_id)), path);
        debug!(url = %url, "Listing remote path");

        let infos: Vec<FileInfo> = self.client.send_json(self.client.get(&url)).await?;
        Ok(infos.into_iter().map(|i| to_entry(storage_id, i)).collect())
    }

    async fn fetch(&self, storage_id: &str, path: &str) -> Result<Vec<u8>, StorageError> {
        let url = self
            .client
            .url(&format!("v3/files/content/{}", urlencoding::encode(storage_id)), path);
        debug!(url = %url, "Fetching remote file");

        Ok(self.client.send_bytes(self.client.get(&url)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_decodes_into_entries() {
        let body = r#"[
            {"name": "tapis_pipeline_manifest_job42", "path": "outbox/tapis_pipeline_manifest_job42",
             "url": "tapis://sys/outbox/tapis_pipeline_manifest_job42", "type": "file", "size": 40},
            {"name": "a.txt", "path": "/outbox/a.txt", "type": "file"}
        ]"#;
        let infos: Vec<FileInfo> = serde_json::from_str(body).unwrap();
        let entries: Vec<RemoteEntry> = infos.into_iter().map(|i| to_entry("sys", i)).collect();

        assert_eq!(entries[0].name, "tapis_pipeline_manifest_job42");
        assert_eq!(entries[0].uri, "tapis://sys/outbox/tapis_pipeline_manifest_job42");
        assert_eq!(entries[1].uri, "tapis://sys/outbox/a.txt");
    }
}
