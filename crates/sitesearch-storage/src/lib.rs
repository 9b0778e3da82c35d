//! Blob storage for index snapshots.
//!
//! Provides a uniform [`BlobStore`] interface (list/get/put/delete over a
//! namespaced key space) with:
//! - [`ObjectStoreBackend`]: in-memory and local-disk storage via `object_store`
//! - [`HttpBlobStore`]: a remote blob service reached over HTTP

pub mod blob;
pub mod error;
pub mod http;
pub mod object_backend;

pub use blob::{BlobEntry, BlobStore};
pub use error::{StorageError, StorageResult};
pub use http::{HttpBlobStore, HttpBlobStoreConfig};
pub use object_backend::ObjectStoreBackend;
