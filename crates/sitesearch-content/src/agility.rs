//! Agility CMS Fetch REST API client.
//!
//! Endpoints used:
//! - `GET {base}/{api}/{locale}/sitemap/flat/{channel}`: object keyed by path
//! - `GET {base}/{api}/{locale}/page/{pageID}?contentLinkDepth=N`
//! - `GET {base}/{api}/{locale}/item/{contentID}` for dynamic page items
//!
//! `api` is `fetch` for published content and `preview` for staging.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sitesearch_types::ContentSettings;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::ContentError;
use crate::page::{zones_from_map, ContentItem, ModuleRecord, OrderedMap, RawPage};
use crate::source::ContentSource;

/// Configuration for [`AgilityContentSource`].
#[derive(Debug, Clone)]
pub struct AgilityConfig {
    /// API base URL, e.g. "https://{guid}-api.agilitycms.cloud"
    pub base_url: String,

    /// Fetch or preview API key
    pub api_key: SecretString,

    /// Read staging content through the preview API
    pub preview: bool,

    pub locale: String,

    /// Sitemap channel name
    pub channel: String,

    pub content_link_depth: u32,

    /// Request timeout
    pub timeout: Duration,

    /// Maximum attempts per request
    pub max_retries: u32,

    /// First retry delay; later delays grow exponentially
    pub retry_initial_interval: Duration,
}

impl AgilityConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: SecretString::from(api_key.into()),
            preview: false,
            locale: "en-us".to_string(),
            channel: "website".to_string(),
            content_link_depth: 4,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_initial_interval: Duration::from_millis(500),
        }
    }

    /// Build from daemon settings. The base URL is derived from the instance
    /// GUID unless set explicitly.
    pub fn from_settings(settings: &ContentSettings) -> Result<Self, ContentError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| ContentError::Config("content.api_key is required".to_string()))?;

        let base_url = match (&settings.base_url, &settings.guid) {
            (Some(url), _) => url.clone(),
            (None, Some(guid)) => format!("https://{}-api.agilitycms.cloud", guid),
            (None, None) => {
                return Err(ContentError::Config(
                    "content.guid or content.base_url is required".to_string(),
                ))
            }
        };

        let mut config = Self::new(base_url, api_key);
        config.preview = settings.preview;
        config.locale = settings.locale.clone();
        config.channel = settings.channel.clone();
        config.content_link_depth = settings.content_link_depth;
        config.timeout = settings.page_timeout();
        Ok(config)
    }

    fn api_root(&self) -> String {
        let api = if self.preview { "preview" } else { "fetch" };
        format!("{}/{}/{}", self.base_url, api, self.locale)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SitemapNode {
    path: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "pageID")]
    page_id: i64,
    #[serde(default, rename = "contentID")]
    content_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    zones: OrderedMap<Option<Vec<ModuleRecord>>>,
}

/// Content source backed by the Agility CMS Fetch API.
pub struct AgilityContentSource {
    client: Client,
    config: AgilityConfig,
    site_map: RwLock<HashMap<String, SitemapNode>>,
}

impl AgilityContentSource {
    pub fn new(config: AgilityConfig) -> Result<Self, ContentError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ContentError::Config(e.to_string()))?;

        Ok(Self {
            client,
            config,
            site_map: RwLock::new(HashMap::new()),
        })
    }

    /// GET a JSON document, retrying transient failures with backoff.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ContentError> {
        let mut backoff = ExponentialBackoff {
            current_interval: self.config.retry_initial_interval,
            initial_interval: self.config.retry_initial_interval,
            max_elapsed_time: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(url, attempt = attempts, "Calling content API");

            match self.request(url).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    if attempts >= self.config.max_retries {
                        error!(error = %e, url, "Max retries exceeded");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                error = %e,
                                retry_in_ms = duration.as_millis(),
                                "Content API call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    async fn request<T: DeserializeOwned>(&self, url: &str) -> Result<T, ContentError> {
        let response = self
            .client
            .get(url)
            .header("APIKey", self.config.api_key.expose_secret())
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ContentError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn load_site_map(&self) -> Result<Vec<String>, ContentError> {
        let url = format!(
            "{}/sitemap/flat/{}",
            self.config.api_root(),
            self.config.channel
        );

        let nodes: OrderedMap<SitemapNode> = self
            .get_json(&url)
            .await
            .map_err(|e| ContentError::SiteMap(e.to_string()))?;

        let paths: Vec<String> = nodes.0.iter().map(|(path, _)| path.clone()).collect();
        *self.site_map.write().await = nodes.0.into_iter().collect();

        info!(pages = paths.len(), channel = %self.config.channel, "Loaded site map");
        Ok(paths)
    }

    async fn node(&self, path: &str) -> Result<SitemapNode, ContentError> {
        if let Some(node) = self.site_map.read().await.get(path) {
            return Ok(node.clone());
        }

        self.load_site_map().await?;
        self.site_map
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| ContentError::PageNotFound(path.to_string()))
    }
}

#[async_trait]
impl ContentSource for AgilityContentSource {
    async fn list_pages(&self) -> Result<Vec<String>, ContentError> {
        self.load_site_map().await
    }

    async fn fetch_page(&self, path: &str) -> Result<RawPage, ContentError> {
        let node = self.node(path).await?;
        let root = self.config.api_root();

        let page_url = format!(
            "{}/page/{}?contentLinkDepth={}",
            root, node.page_id, self.config.content_link_depth
        );
        let page: PageResponse = self.get_json(&page_url).await.map_err(|e| ContentError::Page {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        let content_item = match node.content_id {
            Some(id) => {
                let item_url = format!("{}/item/{}", root, id);
                let item: ContentItem =
                    self.get_json(&item_url).await.map_err(|e| ContentError::Page {
                        path: path.to_string(),
                        message: e.to_string(),
                    })?;
                Some(item)
            }
            None => None,
        };

        Ok(RawPage {
            path: node.path.clone(),
            title: node.title.or(page.title).unwrap_or_default(),
            zones: zones_from_map(page.zones),
            content_item,
        })
    }

    fn name(&self) -> &'static str {
        "agility"
    }
}
