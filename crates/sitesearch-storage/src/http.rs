//! Remote blob service client.
//!
//! Speaks a small REST dialect used by hosted blob stores:
//! - `GET {base}?prefix=..&limit=..&cursor=..` lists blobs page by page
//! - `PUT {base}/{key}` uploads a blob at a fixed pathname
//! - `POST {base}/delete` with `{"urls": [...]}` removes blobs
//! - `GET {url}` downloads a listed blob

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::blob::{BlobEntry, BlobStore};
use crate::error::{StorageError, StorageResult};

const LIST_PAGE_LIMIT: usize = 1000;

/// Configuration for [`HttpBlobStore`].
#[derive(Debug, Clone)]
pub struct HttpBlobStoreConfig {
    /// API base URL, e.g. "https://blob.example.com"
    pub base_url: String,

    /// Read/write token sent as a bearer token
    pub token: SecretString,

    /// Request timeout
    pub timeout: Duration,
}

impl HttpBlobStoreConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: SecretString::from(token.into()),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    blobs: Vec<ListedBlob>,
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ListedBlob {
    url: String,
    pathname: String,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    urls: &'a [String],
}

/// BlobStore implementation for a remote blob service.
pub struct HttpBlobStore {
    client: Client,
    config: HttpBlobStoreConfig,
}

impl HttpBlobStore {
    pub fn new(config: HttpBlobStoreConfig) -> StorageResult<Self> {
        if config.base_url.is_empty() {
            return Err(StorageError::Config("base_url must not be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(
            "Authorization",
            format!("Bearer {}", self.config.token.expose_secret()),
        )
    }

    async fn check(response: Response) -> StorageResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        if status.as_u16() == 404 {
            return Err(StorageError::NotFound(message));
        }
        Err(StorageError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn list(&self, prefix: &str) -> StorageResult<Vec<BlobEntry>> {
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;
        let limit = LIST_PAGE_LIMIT.to_string();

        loop {
            let mut query = vec![("prefix", prefix.to_string()), ("limit", limit.clone())];
            if let Some(c) = &cursor {
                query.push(("cursor", c.clone()));
            }

            let response = self
                .authorized(self.client.get(&self.config.base_url))
                .query(&query)
                .send()
                .await?;
            let page: ListResponse = Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| StorageError::Backend(format!("invalid list response: {}", e)))?;

            entries.extend(
                page.blobs
                    .into_iter()
                    .map(|b| BlobEntry::new(b.pathname, b.url)),
            );

            match page.cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        debug!(prefix, count = entries.len(), "Listed remote blobs");
        Ok(entries)
    }

    async fn get(&self, url: &str) -> StorageResult<Bytes> {
        let response = self.client.get(url).send().await?;
        let bytes = Self::check(response).await?.bytes().await?;
        Ok(bytes)
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let url = format!("{}/{}", self.config.base_url, key.trim_start_matches('/'));
        let response = self
            .authorized(self.client.put(&url))
            .header("x-add-random-suffix", "0")
            .header("x-allow-overwrite", "1")
            .header("x-content-type", "application/json")
            .body(data)
            .send()
            .await?;
        Self::check(response).await?;
        debug!(key, "Uploaded blob");
        Ok(())
    }

    async fn delete(&self, urls: &[String]) -> StorageResult<()> {
        if urls.is_empty() {
            return Ok(());
        }

        for chunk in urls.chunks(LIST_PAGE_LIMIT) {
            let url = format!("{}/delete", self.config.base_url);
            let response = self
                .authorized(self.client.post(&url))
                .json(&DeleteRequest { urls: chunk })
                .send()
                .await?;
            if let Err(e) = Self::check(response).await {
                warn!(error = %e, count = chunk.len(), "Blob delete request failed");
                return Err(e);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
