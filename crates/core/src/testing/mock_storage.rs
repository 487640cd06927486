//! Mock remote storage for testing.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::storage::{RemoteEntry, RemoteStorage, StorageError};

/// A recorded storage call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    List { storage_id: String, path: String },
    Fetch { storage_id: String, path: String },
}

/// In-memory implementation of the RemoteStorage trait.
///
/// Files live in a flat path map. Listing a directory returns its direct
/// children; listing a file path returns that file alone.
///
/// # Example
///
/// ```rust,ignore
/// let storage = MockStorage::new();
/// storage.put_file("/outbox/a.txt", b"hello").await;
/// storage.fail_fetches("/outbox/a.txt", 2).await; // first two fetches fail
///
/// let entries = storage.list("sys", "/outbox").await?;
/// assert_eq!(entries.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockStorage {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    calls: Arc<RwLock<Vec<StorageCall>>>,
    /// If set, every list call fails with ConnectionFailed(msg).
    list_error: Arc<RwLock<Option<String>>>,
    /// Remaining transient failures per fetched path.
    fetch_failures: Arc<RwLock<HashMap<String, u32>>>,
    /// Artificial latency before every response.
    delay: Arc<RwLock<Option<Duration>>>,
    /// Extra latency for fetches of specific paths.
    fetch_delays: Arc<RwLock<HashMap<String, Duration>>>,
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            files: Arc::new(RwLock::new(BTreeMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            list_error: Arc::new(RwLock::new(None)),
            fetch_failures: Arc::new(RwLock::new(HashMap::new())),
            delay: Arc::new(RwLock::new(None)),
            fetch_delays: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add or replace a file.
    pub async fn put_file(&self, path: &str, contents: impl Into<Vec<u8>>) {
        self.files
            .write()
            .await
            .insert(normalize(path), contents.into());
    }

    pub async fn remove_file(&self, path: &str) {
        self.files.write().await.remove(&normalize(path));
    }

    /// Make every listing fail until cleared with `None`.
    pub async fn set_list_error(&self, message: Option<&str>) {
        *self.list_error.write().await = message.map(str::to_string);
    }

    /// Make the next `count` fetches of `path` fail with a connection error.
    pub async fn fail_fetches(&self, path: &str, count: u32) {
        self.fetch_failures
            .write()
            .await
            .insert(normalize(path), count);
    }

    /// Delay every response, e.g. to trip call timeouts.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().await = delay;
    }

    /// Delay every fetch of `path`; listings stay fast.
    pub async fn delay_fetches(&self, path: &str, delay: Duration) {
        self.fetch_delays.write().await.insert(normalize(path), delay);
    }

    /// All calls made so far.
    pub async fn calls(&self) -> Vec<StorageCall> {
        self.calls.read().await.clone()
    }

    /// Number of fetches made for `path`.
    pub async fn fetch_count(&self, path: &str) -> usize {
        let path = normalize(path);
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, StorageCall::Fetch { path: p, .. } if *p == path))
            .count()
    }

    async fn pause(&self) {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn normalize(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

fn entry(storage_id: &str, path: &str) -> RemoteEntry {
    let name = path.rsplit('/').next().unwrap_or(path).to_string();
    RemoteEntry {
        name,
        path: path.to_string(),
        uri: format!("tapis://{}/{}", storage_id, path.trim_start_matches('/')),
    }
}

#[async_trait]
impl RemoteStorage for MockStorage {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list(&self, storage_id: &str, path: &str) -> Result<Vec<RemoteEntry>, StorageError> {
        let path = normalize(path);
        self.calls.write().await.push(StorageCall::List {
            storage_id: storage_id.to_string(),
            path: path.clone(),
        });
        self.pause().await;

        if let Some(msg) = self.list_error.read().await.clone() {
            return Err(StorageError::ConnectionFailed(msg));
        }

        let files = self.files.read().await;
        if files.contains_key(&path) {
            return Ok(vec![entry(storage_id, &path)]);
        }

        let dir = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        };
        Ok(files
            .keys()
            .filter(|p| {
                p.strip_prefix(&dir)
                    .map(|rest| !rest.is_empty() && !rest.contains('/'))
                    .unwrap_or(false)
            })
            .map(|p| entry(storage_id, p))
            .collect())
    }

    async fn fetch(&self, storage_id: &str, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = normalize(path);
        self.calls.write().await.push(StorageCall::Fetch {
            storage_id: storage_id.to_string(),
            path: path.clone(),
        });
        self.pause().await;

        let fetch_delay = self.fetch_delays.read().await.get(&path).copied();
        if let Some(delay) = fetch_delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = self.fetch_failures.write().await;
            if let Some(remaining) = failures.get_mut(&path) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(StorageError::ConnectionFailed(format!(
                        "simulated failure fetching {}",
                        path
                    )));
                }
            }
        }

        self.files
            .read()
            .await
            .get(&path)
            .cloned()
            .ok_or(StorageError::NotFound(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_list_directory_and_file() {
        let storage = MockStorage::new();
        storage.put_file("/outbox/a.txt", "a").await;
        storage.put_file("/outbox/nested/b.txt", "b").await;

        let entries = storage.list("sys", "/outbox/").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].uri, "tapis://sys/outbox/a.txt");

        let entries = storage.list("sys", "outbox/nested/b.txt").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/outbox/nested/b.txt");

        assert!(storage.list("sys", "/missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transient_fetch_failures() {
        let storage = MockStorage::new();
        storage.put_file("/outbox/m", "{}").await;
        storage.fail_fetches("/outbox/m", 1).await;

        assert_err!(storage.fetch("sys", "/outbox/m").await);
        assert_eq!(assert_ok!(storage.fetch("sys", "/outbox/m").await), b"{}");
        assert_eq!(storage.fetch_count("/outbox/m").await, 2);
    }

    #[tokio::test]
    async fn test_list_error() {
        let storage = MockStorage::new();
        storage.set_list_error(Some("down")).await;
        assert!(matches!(
            storage.list("sys", "/outbox").await,
            Err(StorageError::ConnectionFailed(_))
        ));
    }
}
