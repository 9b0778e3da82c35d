//! End-to-end test infrastructure for site search.
//!
//! Provides a shared TestHarness wiring an in-memory content source and a
//! local-disk snapshot store into lifecycle managers, so tests can simulate
//! process restarts against the same persisted state.

use std::sync::Arc;
use std::time::Duration;

use sitesearch_content::{ContentSync, InMemoryContentSource, RawPage};
use sitesearch_service::{IndexLifecycleManager, LifecycleConfig, SnapshotManager};
use sitesearch_storage::{BlobStore, ObjectStoreBackend};

/// Snapshot key prefix used by every harness manager.
pub const SNAPSHOT_PREFIX: &str = "search-index";

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Blob store on local disk, shared across simulated restarts
    pub store: Arc<dyn BlobStore>,
    /// Content source shared by every manager built from this harness
    pub source: Arc<InMemoryContentSource>,
}

impl TestHarness {
    /// Create a harness serving `pages` with an empty snapshot store.
    pub fn new(pages: Vec<RawPage>) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let store = ObjectStoreBackend::local(temp_dir.path().join("snapshots"))
            .expect("Failed to open snapshot store");

        Self {
            _temp_dir: temp_dir,
            store: Arc::new(store),
            source: Arc::new(InMemoryContentSource::new(pages)),
        }
    }

    /// Snapshot manager over the harness store.
    pub fn snapshots(&self) -> SnapshotManager {
        SnapshotManager::new(self.store.clone(), SNAPSHOT_PREFIX)
    }

    /// A fresh manager, as after a process start.
    pub fn manager(&self) -> IndexLifecycleManager {
        IndexLifecycleManager::new(
            ContentSync::new(self.source.clone()),
            Some(self.snapshots()),
            LifecycleConfig::default(),
        )
    }

    /// A fresh manager with a content source of its own.
    pub fn manager_with_source(&self, source: Arc<InMemoryContentSource>) -> IndexLifecycleManager {
        IndexLifecycleManager::new(
            ContentSync::new(source),
            Some(self.snapshots()),
            LifecycleConfig::default(),
        )
    }
}

/// The two-page site: Home and About.
pub fn home_and_about() -> Vec<RawPage> {
    vec![
        RawPage::rich_text("/", "Home", "<p>Welcome to our site</p>"),
        RawPage::rich_text("/about", "About", "<p>Our <b>team</b></p>"),
    ]
}

/// `count` generated pages, each mentioning its own number.
pub fn numbered_site(count: usize, topic: &str) -> Vec<RawPage> {
    (0..count)
        .map(|i| {
            RawPage::rich_text(
                format!("/{topic}/{i}"),
                format!("{topic} page {i}"),
                &format!("<p>Article number {i} about {topic}</p>"),
            )
        })
        .collect()
}

/// A source that answers slowly, for overlapping concurrent callers.
pub fn slow_source(pages: Vec<RawPage>, latency: Duration) -> Arc<InMemoryContentSource> {
    Arc::new(InMemoryContentSource::new(pages).with_latency(latency))
}
