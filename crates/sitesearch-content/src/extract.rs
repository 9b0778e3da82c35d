//! Page text extraction.
//!
//! Each module kind maps to a function that pulls its HTML out of the page.
//! Texts are joined in zone order, then tags are stripped and whitespace
//! collapsed. Modules without a registered extractor contribute nothing.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::page::{ModuleRecord, RawPage};

/// Extraction function for one module kind.
pub type Extractor = Box<dyn Fn(&RawPage, &ModuleRecord) -> Option<String> + Send + Sync>;

static HTML_TAG: OnceLock<Regex> = OnceLock::new();
static LINE_BREAKS: OnceLock<Regex> = OnceLock::new();
static DEFAULT_REGISTRY: OnceLock<ExtractorRegistry> = OnceLock::new();

/// Remove HTML tags and collapse line breaks and whitespace runs.
pub fn strip_html(html: &str) -> String {
    let tags = HTML_TAG.get_or_init(|| Regex::new(r"</?[^>]+(>|$)").expect("tag pattern is valid"));
    let breaks = LINE_BREAKS.get_or_init(|| Regex::new(r"[\r\n]+").expect("newline pattern is valid"));

    let without_tags = tags.replace_all(html, "");
    let single_line = breaks.replace_all(&without_tags, " ");
    single_line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract searchable text from a page with the default registry.
pub fn extract_text(page: &RawPage) -> String {
    DEFAULT_REGISTRY
        .get_or_init(ExtractorRegistry::with_defaults)
        .extract_text(page)
}

/// Dispatch table from module kind to extractor.
pub struct ExtractorRegistry {
    extractors: HashMap<String, Extractor>,
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.extractors.keys().collect();
        kinds.sort();
        f.debug_struct("ExtractorRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ExtractorRegistry {
    /// Registry with no extractors.
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Registry for the site's module definitions.
    ///
    /// - `PostDetails`: the page's dynamic item `content` field
    /// - `RichTextArea`: the module item's `textblob` field
    /// - `TextBlockWithImage`: the module item's `content` field
    pub fn with_defaults() -> Self {
        Self::empty()
            .register("PostDetails", |page, _| {
                page.content_item
                    .as_ref()
                    .and_then(|item| item.field_str("content"))
                    .map(str::to_string)
            })
            .register("RichTextArea", module_field("textblob"))
            .register("TextBlockWithImage", module_field("content"))
    }

    /// Add or replace the extractor for a module kind.
    pub fn register<F>(mut self, kind: impl Into<String>, extractor: F) -> Self
    where
        F: Fn(&RawPage, &ModuleRecord) -> Option<String> + Send + Sync + 'static,
    {
        self.extractors.insert(kind.into(), Box::new(extractor));
        self
    }

    pub fn handles(&self, kind: &str) -> bool {
        self.extractors.contains_key(kind)
    }

    /// Plain text of every recognised module, in zone order.
    pub fn extract_text(&self, page: &RawPage) -> String {
        let parts: Vec<String> = page
            .zones
            .iter()
            .flat_map(|zone| zone.modules.iter())
            .filter_map(|module| {
                self.extractors
                    .get(&module.module)
                    .and_then(|extract| extract(page, module))
            })
            .collect();

        strip_html(&parts.join(" "))
    }
}

/// Extractor reading a string field of the module's own item.
fn module_field(
    name: &'static str,
) -> impl Fn(&RawPage, &ModuleRecord) -> Option<String> + Send + Sync + 'static {
    move |_, module| {
        module
            .item
            .as_ref()
            .and_then(|item| item.field_str(name))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_html("line one\r\n\r\nline two"), "line one line two");
        assert_eq!(strip_html("<p>a</p>\n<p>b</p>"), "a b");
        assert_eq!(strip_html("dangling <img src='x'"), "dangling");
        assert_eq!(strip_html("   "), "");
    }

    #[test]
    fn test_extract_default_modules_in_zone_order() {
        let page = RawPage::new("/", "Home")
            .with_module(
                "Main",
                ModuleRecord::new("RichTextArea", json!({"textblob": "<h2>Welcome</h2>\n<p>to our</p>"})),
            )
            .with_module(
                "Main",
                ModuleRecord::new("TextBlockWithImage", json!({"content": "<p>site</p>"})),
            );
        assert_eq!(extract_text(&page), "Welcome to our site");
    }

    #[test]
    fn test_post_details_reads_dynamic_item() {
        let page = RawPage::new("/blog/first", "First post")
            .with_module("Main", ModuleRecord::new("PostDetails", json!({})))
            .with_content_item(json!({"content": "<p>Post body</p>"}));
        assert_eq!(extract_text(&page), "Post body");
    }

    #[test]
    fn test_unknown_and_incomplete_modules_skipped() {
        let page = RawPage::new("/", "Home")
            .with_module("Main", ModuleRecord::new("Heading", json!({"title": "Skipped"})))
            .with_module("Main", ModuleRecord::new("RichTextArea", json!({})))
            .with_module("Main", ModuleRecord::new("PostDetails", json!({})))
            .with_module("Main", ModuleRecord::new("RichTextArea", json!({"textblob": "kept"})));
        assert_eq!(extract_text(&page), "kept");
    }

    #[test]
    fn test_custom_registration() {
        let registry = ExtractorRegistry::empty().register("Heading", module_field("title"));
        let page = RawPage::new("/", "Home")
            .with_module("Main", ModuleRecord::new("Heading", json!({"title": "Hi"})))
            .with_module("Main", ModuleRecord::new("RichTextArea", json!({"textblob": "x"})));
        assert!(registry.handles("Heading"));
        assert!(!registry.handles("RichTextArea"));
        assert_eq!(registry.extract_text(&page), "Hi");
    }
}
