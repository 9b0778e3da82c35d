//! `object_store` adapter implementing the [`BlobStore`] trait.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{local::LocalFileSystem, memory::InMemory, path::Path, ObjectStore, PutPayload};
use tracing::debug;

use crate::blob::{BlobEntry, BlobStore};
use crate::error::{StorageError, StorageResult};

/// BlobStore implementation backed by the object_store crate.
///
/// Keys double as URLs: `list` returns each object's location for both.
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    name: &'static str,
}

impl ObjectStoreBackend {
    /// Create a backend from any object_store implementation.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            name: "object_store",
        }
    }

    /// Create a process-local in-memory backend.
    pub fn memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            name: "memory",
        }
    }

    /// Create a backend for local filesystem storage rooted at `path`.
    pub fn local(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path)
            .map_err(|e| StorageError::Io(format!("failed to create directory: {}", e)))?;

        let store = LocalFileSystem::new_with_prefix(&path)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self {
            store: Arc::new(store),
            name: "local",
        })
    }
}

fn map_error(path: &str, err: object_store::Error) -> StorageError {
    match err {
        object_store::Error::NotFound { .. } => StorageError::NotFound(path.to_string()),
        other => StorageError::Backend(other.to_string()),
    }
}

#[async_trait]
impl BlobStore for ObjectStoreBackend {
    async fn list(&self, prefix: &str) -> StorageResult<Vec<BlobEntry>> {
        let prefix_path = if prefix.is_empty() {
            None
        } else {
            Some(Path::from(prefix))
        };

        let objects: Vec<_> = self
            .store
            .list(prefix_path.as_ref())
            .try_collect()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let mut entries: Vec<BlobEntry> = objects
            .into_iter()
            .map(|meta| {
                let key = meta.location.to_string();
                BlobEntry::new(key.clone(), key)
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        debug!(prefix, count = entries.len(), backend = self.name, "Listed blobs");
        Ok(entries)
    }

    async fn get(&self, url: &str) -> StorageResult<Bytes> {
        let location = Path::from(url);
        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| map_error(url, e))?;

        result
            .bytes()
            .await
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let location = Path::from(key);
        self.store
            .put(&location, PutPayload::from_bytes(data))
            .await
            .map_err(|e| map_error(key, e))?;
        Ok(())
    }

    async fn delete(&self, urls: &[String]) -> StorageResult<()> {
        for url in urls {
            let location = Path::from(url.as_str());
            match self.store.delete(&location).await {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(StorageError::Backend(e.to_string())),
            }
        }
        debug!(count = urls.len(), backend = self.name, "Deleted blobs");
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_put_get() {
        let store = ObjectStoreBackend::memory();

        store
            .put("search-index/g1/store.0.json", Bytes::from("[]"))
            .await
            .unwrap();

        let data = store.get("search-index/g1/store.0.json").await.unwrap();
        assert_eq!(&data[..], b"[]");
    }

    #[tokio::test]
    async fn test_local_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = ObjectStoreBackend::local(tmp.path()).unwrap();

        let result = store.get("missing.json").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_local_list_by_prefix() {
        let tmp = TempDir::new().unwrap();
        let store = ObjectStoreBackend::local(tmp.path()).unwrap();

        store.put("search-index/g1/a.json", Bytes::from("a")).await.unwrap();
        store.put("search-index/g1/b.json", Bytes::from("b")).await.unwrap();
        store.put("other/c.json", Bytes::from("c")).await.unwrap();

        let entries = store.list("search-index").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "search-index/g1/a.json");
        assert_eq!(entries[0].url, entries[0].key);
        assert_eq!(entries[1].key, "search-index/g1/b.json");
    }

    #[tokio::test]
    async fn test_list_empty_prefix_is_empty() {
        let store = ObjectStoreBackend::memory();
        let entries = store.list("search-index").await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_delete_ignores_missing() {
        let store = ObjectStoreBackend::memory();
        store.put("p/a.json", Bytes::from("a")).await.unwrap();

        store
            .delete(&["p/a.json".to_string(), "p/never-written.json".to_string()])
            .await
            .unwrap();

        assert!(store.list("p").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = ObjectStoreBackend::local(tmp.path()).unwrap();

        store.put("p/a.json", Bytes::from("one")).await.unwrap();
        store.put("p/a.json", Bytes::from("two")).await.unwrap();

        assert_eq!(&store.get("p/a.json").await.unwrap()[..], b"two");
        assert_eq!(store.name(), "local");
    }
}
