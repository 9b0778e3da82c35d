//! Full content sync: site map walk and concurrent page fetch.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use sitesearch_types::Document;
use tracing::{debug, info, warn};

use crate::error::ContentError;
use crate::extract::ExtractorRegistry;
use crate::source::ContentSource;

/// Default per-page fetch deadline.
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// A page left out of a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub path: String,
    pub error: String,
}

/// Result of one sync cycle.
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// One document per fetched page, in site map order
    pub documents: Vec<Document>,
    /// Pages skipped because their fetch or conversion failed
    pub failures: Vec<PageFailure>,
}

impl SyncOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetches every page of a site and converts it to a [`Document`].
#[derive(Clone)]
pub struct ContentSync {
    source: Arc<dyn ContentSource>,
    registry: Arc<ExtractorRegistry>,
    page_timeout: Duration,
}

impl ContentSync {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            source,
            registry: Arc::new(ExtractorRegistry::with_defaults()),
            page_timeout: DEFAULT_PAGE_TIMEOUT,
        }
    }

    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    pub fn source(&self) -> &Arc<dyn ContentSource> {
        &self.source
    }

    /// Fetch all pages concurrently.
    ///
    /// A site map failure aborts the sync. A failing or slow page is skipped
    /// and recorded in [`SyncOutcome::failures`].
    pub async fn fetch_all(&self) -> Result<SyncOutcome, ContentError> {
        let start = Instant::now();
        let listed = self.source.list_pages().await.map_err(|e| match e {
            ContentError::SiteMap(_) => e,
            other => ContentError::SiteMap(other.to_string()),
        })?;

        let mut seen = HashSet::new();
        let paths: Vec<String> = listed
            .into_iter()
            .filter(|path| {
                let first = seen.insert(path.clone());
                if !first {
                    debug!(path = %path, "Skipping duplicate site map entry");
                }
                first
            })
            .collect();

        let results = join_all(paths.iter().map(|path| self.fetch_document(path))).await;

        let mut outcome = SyncOutcome::default();
        for (path, result) in paths.into_iter().zip(results) {
            match result {
                Ok(doc) => outcome.documents.push(doc),
                Err(e) => {
                    warn!(path = %path, error = %e, "Skipping page");
                    outcome.failures.push(PageFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            source = self.source.name(),
            documents = outcome.documents.len(),
            failures = outcome.failures.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Content sync complete"
        );
        Ok(outcome)
    }

    async fn fetch_document(&self, path: &str) -> Result<Document, ContentError> {
        let page = tokio::time::timeout(self.page_timeout, self.source.fetch_page(path))
            .await
            .map_err(|_| ContentError::Timeout(path.to_string()))??;

        let content = self.registry.extract_text(&page);
        Document::new(page.path.clone(), page.title, content, page.path).map_err(|e| {
            ContentError::Page {
                path: path.to_string(),
                message: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryContentSource;
    use crate::page::RawPage;

    fn site() -> Vec<RawPage> {
        vec![
            RawPage::rich_text("/", "Home", "<p>Welcome to our site</p>"),
            RawPage::rich_text("/about", "About", "<p>Our team</p>"),
            RawPage::rich_text("/contact", "Contact", "<p>Write to us</p>"),
        ]
    }

    #[tokio::test]
    async fn test_fetch_all_in_site_map_order() {
        let source = Arc::new(InMemoryContentSource::new(site()));
        let sync = ContentSync::new(source.clone());

        let outcome = sync.fetch_all().await.unwrap();
        let ids: Vec<&str> = outcome.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["/", "/about", "/contact"]);
        assert_eq!(outcome.documents[0].content, "Welcome to our site");
        assert_eq!(outcome.documents[1].url, "/about");
        assert!(outcome.is_complete());
        assert_eq!(source.list_calls(), 1);
        assert_eq!(source.fetch_calls(), 3);
    }

    #[tokio::test]
    async fn test_page_failure_is_isolated() {
        let source = Arc::new(InMemoryContentSource::new(site()).with_failing_page("/about"));
        let outcome = ContentSync::new(source).fetch_all().await.unwrap();

        assert_eq!(outcome.documents.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].path, "/about");
        assert!(!outcome.is_complete());
    }

    #[tokio::test]
    async fn test_site_map_failure_is_fatal() {
        let source = Arc::new(InMemoryContentSource::new(site()));
        source.set_site_map_down(true);

        let err = ContentSync::new(source).fetch_all().await.unwrap_err();
        assert!(matches!(err, ContentError::SiteMap(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_pages_time_out() {
        let source = Arc::new(
            InMemoryContentSource::new(site()).with_latency(Duration::from_secs(30)),
        );
        // Listing is slow too, but only page fetches carry a deadline.
        let outcome = ContentSync::new(source)
            .with_page_timeout(Duration::from_secs(5))
            .fetch_all()
            .await
            .unwrap();

        assert!(outcome.documents.is_empty());
        assert_eq!(outcome.failures.len(), 3);
        assert!(outcome.failures[0].error.contains("Timed out"));
    }

    #[tokio::test]
    async fn test_duplicate_paths_keep_first() {
        let mut pages = site();
        pages.push(RawPage::rich_text("/", "Home again", "<p>Duplicate</p>"));
        let source = Arc::new(InMemoryContentSource::new(pages));

        let outcome = ContentSync::new(source).fetch_all().await.unwrap();
        assert_eq!(outcome.documents.len(), 3);
        assert_eq!(outcome.documents[0].title, "Home");
    }

    #[tokio::test]
    async fn test_empty_path_is_a_page_failure() {
        let source = Arc::new(InMemoryContentSource::new(vec![
            RawPage::rich_text("", "Nameless", "x"),
            RawPage::rich_text("/ok", "Ok", "y"),
        ]));
        let outcome = ContentSync::new(source).fetch_all().await.unwrap();
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.failures[0].path, "");
    }
}
