//! Blob store abstraction.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageResult;

/// A listed blob.
///
/// `key` is the logical name under which the blob was written; `url` is the
/// address to read or delete it with. Local backends use the key as the URL,
/// remote services hand out their own URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    pub key: String,
    pub url: String,
}

impl BlobEntry {
    pub fn new(key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
        }
    }
}

/// Abstraction over blob storage backends (memory, local filesystem, remote).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// List every blob whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<BlobEntry>>;

    /// Read an entire blob by the URL returned from [`BlobStore::list`].
    async fn get(&self, url: &str) -> StorageResult<Bytes>;

    /// Write a blob (overwrites if it exists).
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete blobs by URL. Missing blobs are not an error.
    async fn delete(&self, urls: &[String]) -> StorageResult<()>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
