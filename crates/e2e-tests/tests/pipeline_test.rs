//! Content-to-query E2E tests for site search.
//!
//! Pages are fetched from the content source, converted, indexed and
//! queried through the lifecycle manager.

use pretty_assertions::assert_eq;

use e2e_tests::{home_and_about, numbered_site, TestHarness};
use sitesearch_index::{Field, SearchOptions};
use sitesearch_service::{IndexSource, LifecycleState};

fn ids(hits: &[sitesearch_index::SearchHit]) -> Vec<&str> {
    hits.iter().map(|h| h.document.id.as_str()).collect()
}

#[tokio::test]
async fn test_home_and_about_scenario() {
    let harness = TestHarness::new(home_and_about());
    let manager = harness.manager();
    let options = SearchOptions::new();

    assert_eq!(manager.state(), LifecycleState::Empty);

    let hits = manager.search("welcome", &options).await.unwrap();
    assert_eq!(ids(&hits), vec!["/"]);
    assert_eq!(hits[0].document.title, "Home");
    assert_eq!(hits[0].document.content, "Welcome to our site");
    assert_eq!(hits[0].document.url, "/");

    let hits = manager.search("team", &options).await.unwrap();
    assert_eq!(ids(&hits), vec!["/about"]);
    assert_eq!(hits[0].document.content, "Our team");

    // Equal scores fall back to id order.
    let hits = manager.search("our", &options).await.unwrap();
    assert_eq!(ids(&hits), vec!["/", "/about"]);

    let status = manager.status();
    assert_eq!(status.state, LifecycleState::Warm);
    assert_eq!(status.documents, Some(2));
    assert_eq!(status.source, Some(IndexSource::Content));
    assert_eq!(harness.source.list_calls(), 1);
}

#[tokio::test]
async fn test_substring_and_field_selection() {
    let harness = TestHarness::new(home_and_about());
    let manager = harness.manager();

    let hits = manager.search("elcom", &SearchOptions::new()).await.unwrap();
    assert_eq!(ids(&hits), vec!["/"]);

    // "about" is in both the title and the url of one page: one hit.
    let hits = manager.search("about", &SearchOptions::new()).await.unwrap();
    assert_eq!(ids(&hits), vec!["/about"]);
    assert!(hits[0].fields.contains(&Field::Title));
    assert!(hits[0].fields.contains(&Field::Url));

    let content_only = SearchOptions::new().with_field(Field::Content);
    let hits = manager.search("about", &content_only).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_every_title_is_findable() {
    let pages = numbered_site(25, "guides");
    let harness = TestHarness::new(pages);
    let manager = harness.manager();
    let titles_only = SearchOptions::new().with_field(Field::Title);

    let generation = manager.ensure_ready().await.unwrap();
    assert_eq!(generation.engine.len(), 25);

    for doc in generation.engine.documents() {
        let hits = manager.search(&doc.title, &titles_only).await.unwrap();
        assert!(
            hits.iter().any(|h| h.document.id == doc.id),
            "title {:?} not found",
            doc.title
        );
    }
}

#[tokio::test]
async fn test_limit_caps_results() {
    let harness = TestHarness::new(numbered_site(30, "news"));
    let manager = harness.manager();

    let hits = manager
        .search("news", &SearchOptions::new().with_limit(7))
        .await
        .unwrap();
    assert_eq!(hits.len(), 7);

    let hits = manager.search("news", &SearchOptions::new()).await.unwrap();
    assert_eq!(hits.len(), 30);
}
