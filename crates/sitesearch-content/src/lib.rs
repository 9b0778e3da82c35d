//! # sitesearch-content
//!
//! Turns a headless CMS site into search documents.
//!
//! ## Components
//! - [`ContentSource`]: site map listing and per-page fetch
//! - [`AgilityContentSource`]: Agility CMS Fetch REST API client
//! - [`InMemoryContentSource`]: static pages for tests and demos
//! - [`ExtractorRegistry`]: module kind -> text extraction dispatch
//! - [`ContentSync`]: concurrent fetch of every page with per-page isolation

pub mod agility;
pub mod error;
pub mod extract;
pub mod memory;
pub mod page;
pub mod source;
pub mod sync;

pub use agility::{AgilityConfig, AgilityContentSource};
pub use error::ContentError;
pub use extract::{extract_text, strip_html, ExtractorRegistry};
pub use memory::InMemoryContentSource;
pub use page::{ContentItem, ModuleRecord, RawPage, Zone};
pub use source::ContentSource;
pub use sync::{ContentSync, PageFailure, SyncOutcome};
