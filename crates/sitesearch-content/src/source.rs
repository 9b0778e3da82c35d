//! Content source trait.

use async_trait::async_trait;

use crate::error::ContentError;
use crate::page::RawPage;

/// A site whose pages can be enumerated and fetched.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Page paths in site map order.
    async fn list_pages(&self) -> Result<Vec<String>, ContentError>;

    /// Fetch one page by path.
    async fn fetch_page(&self, path: &str) -> Result<RawPage, ContentError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
