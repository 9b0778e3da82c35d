//! In-memory content source for tests and demos.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ContentError;
use crate::page::RawPage;
use crate::source::ContentSource;

/// Serves a fixed list of pages, with optional injected failures and latency.
#[derive(Debug, Default)]
pub struct InMemoryContentSource {
    pages: RwLock<Vec<RawPage>>,
    failing: RwLock<HashSet<String>>,
    latency: Option<Duration>,
    site_map_down: AtomicBool,
    list_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl InMemoryContentSource {
    pub fn new(pages: Vec<RawPage>) -> Self {
        Self {
            pages: RwLock::new(pages),
            ..Default::default()
        }
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make fetching `path` fail.
    pub fn with_failing_page(mut self, path: impl Into<String>) -> Self {
        self.failing.get_mut().insert(path.into());
        self
    }

    /// Replace the site's pages.
    pub async fn set_pages(&self, pages: Vec<RawPage>) {
        *self.pages.write().await = pages;
    }

    pub async fn set_page_failing(&self, path: impl Into<String>, failing: bool) {
        let mut set = self.failing.write().await;
        let path = path.into();
        if failing {
            set.insert(path);
        } else {
            set.remove(&path);
        }
    }

    /// Make the site map unavailable (or available again).
    pub fn set_site_map_down(&self, down: bool) {
        self.site_map_down.store(down, Ordering::SeqCst);
    }

    /// Number of site map listings, i.e. sync cycles started.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of page fetches.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ContentSource for InMemoryContentSource {
    async fn list_pages(&self) -> Result<Vec<String>, ContentError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        if self.site_map_down.load(Ordering::SeqCst) {
            return Err(ContentError::SiteMap("site map unavailable".to_string()));
        }

        Ok(self.pages.read().await.iter().map(|p| p.path.clone()).collect())
    }

    async fn fetch_page(&self, path: &str) -> Result<RawPage, ContentError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        if self.failing.read().await.contains(path) {
            return Err(ContentError::Page {
                path: path.to_string(),
                message: "injected failure".to_string(),
            });
        }

        self.pages
            .read()
            .await
            .iter()
            .find(|p| p.path == path)
            .cloned()
            .ok_or_else(|| ContentError::PageNotFound(path.to_string()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_and_fetches_pages() {
        let source = InMemoryContentSource::new(vec![
            RawPage::rich_text("/", "Home", "<p>Welcome</p>"),
            RawPage::rich_text("/about", "About", "<p>Team</p>"),
        ]);

        assert_eq!(source.list_pages().await.unwrap(), vec!["/", "/about"]);
        assert_eq!(source.fetch_page("/about").await.unwrap().title, "About");
        assert!(matches!(
            source.fetch_page("/missing").await,
            Err(ContentError::PageNotFound(_))
        ));
        assert_eq!(source.list_calls(), 1);
        assert_eq!(source.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let source = InMemoryContentSource::new(vec![RawPage::rich_text("/", "Home", "x")])
            .with_failing_page("/");
        assert!(source.fetch_page("/").await.is_err());

        source.set_page_failing("/", false).await;
        assert!(source.fetch_page("/").await.is_ok());

        source.set_site_map_down(true);
        assert!(matches!(
            source.list_pages().await,
            Err(ContentError::SiteMap(_))
        ));
    }

    #[tokio::test]
    async fn test_set_pages() {
        let source = InMemoryContentSource::new(Vec::new());
        assert!(source.list_pages().await.unwrap().is_empty());
        source
            .set_pages(vec![RawPage::rich_text("/new", "New", "fresh")])
            .await;
        assert_eq!(source.list_pages().await.unwrap(), vec!["/new"]);
    }
}
