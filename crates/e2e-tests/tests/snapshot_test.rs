//! Snapshot persistence E2E tests for site search.
//!
//! An empty store triggers a content fetch and a snapshot write; later
//! process starts load that snapshot without touching the content source.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use e2e_tests::{home_and_about, numbered_site, TestHarness, SNAPSHOT_PREFIX};
use sitesearch_content::InMemoryContentSource;
use sitesearch_index::SearchOptions;
use sitesearch_service::IndexSource;
use sitesearch_storage::BlobStore;

#[tokio::test]
async fn test_cold_start_uses_snapshot() {
    let harness = TestHarness::new(home_and_about());

    // First start: nothing stored, so content is fetched and persisted.
    let first = harness.manager();
    let generation = first.ensure_ready().await.unwrap();
    assert_eq!(generation.source, IndexSource::Content);
    assert!(generation.snapshot.is_some());
    assert_eq!(harness.source.list_calls(), 1);

    let stored = harness.snapshots().inspect().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].complete);
    assert_eq!(stored[0].document_count, Some(2));
    assert_eq!(Some(stored[0].generation.clone()), generation.snapshot);

    // Second start with an untouched source: the snapshot is enough.
    let untouched = Arc::new(InMemoryContentSource::new(home_and_about()));
    let second = harness.manager_with_source(untouched.clone());
    let restored = second.ensure_ready().await.unwrap();

    assert_eq!(restored.source, IndexSource::Snapshot);
    assert_eq!(restored.snapshot, generation.snapshot);
    assert_eq!(untouched.list_calls(), 0);
    assert_eq!(untouched.fetch_calls(), 0);

    let options = SearchOptions::new();
    for query in ["welcome", "team", "our", "about"] {
        let before = first.search(query, &options).await.unwrap();
        let after = second.search(query, &options).await.unwrap();
        assert_eq!(before, after, "results differ for {query:?}");
    }
}

#[tokio::test]
async fn test_rebuild_replaces_stored_generation() {
    let harness = TestHarness::new(numbered_site(12, "docs"));
    let manager = harness.manager();

    let first = manager.ensure_ready().await.unwrap();
    let rebuilt = manager.rebuild().await.unwrap();

    assert_eq!(rebuilt.source, IndexSource::Content);
    assert_ne!(first.snapshot, rebuilt.snapshot);

    let stored = harness.snapshots().inspect().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(Some(stored[0].generation.clone()), rebuilt.snapshot);
}

#[tokio::test]
async fn test_torn_snapshot_falls_back_to_content() {
    let harness = TestHarness::new(numbered_site(40, "blog"));
    harness.manager().ensure_ready().await.unwrap();

    // Lose one data segment, as if a save was cut short.
    let entries = harness.store.list(SNAPSHOT_PREFIX).await.unwrap();
    let victim = entries
        .iter()
        .find(|e| !e.key.contains("_manifest"))
        .expect("snapshot has data segments")
        .url
        .clone();
    harness.store.delete(&[victim]).await.unwrap();

    let fresh = Arc::new(InMemoryContentSource::new(numbered_site(40, "blog")));
    let manager = harness.manager_with_source(fresh.clone());
    let generation = manager.ensure_ready().await.unwrap();

    assert_eq!(generation.source, IndexSource::Content);
    assert_eq!(generation.engine.len(), 40);
    assert_eq!(fresh.list_calls(), 1);

    // The rebuild wrote a complete replacement.
    let stored = harness.snapshots().inspect().await.unwrap();
    assert!(stored[0].complete);
    assert_eq!(stored[0].document_count, Some(40));
}

#[tokio::test]
async fn test_invalidate_refreshes_snapshot() {
    let harness = TestHarness::new(home_and_about());
    let manager = harness.manager();
    manager.ensure_ready().await.unwrap();

    harness
        .source
        .set_pages(numbered_site(3, "events"))
        .await;
    manager.invalidate();

    // The stored snapshot is outdated, so content is fetched again.
    let generation = manager.ensure_ready().await.unwrap();
    assert_eq!(generation.source, IndexSource::Content);
    assert_eq!(generation.engine.len(), 3);
    assert_eq!(harness.source.list_calls(), 2);

    // A later start sees the refreshed snapshot.
    let untouched = Arc::new(InMemoryContentSource::new(Vec::new()));
    let restarted = harness.manager_with_source(untouched.clone());
    let hits = restarted
        .search("events", &SearchOptions::new())
        .await
        .unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(untouched.list_calls(), 0);
}
