//! # sitesearch-index
//!
//! In-memory full-text index over site pages.
//!
//! ## Features
//! - Per-field inverted index (title, content, url) with stored documents
//! - Substring matching: every fragment of an indexed word is a posting key
//! - Multi-field search with per-document deduplication and tf-idf ranking
//! - Export to opaque named segments and incremental, order-independent import

pub mod analyzer;
pub mod engine;
pub mod error;
pub mod postings;
pub mod schema;
pub mod search;
pub mod segments;

pub use analyzer::Analyzer;
pub use engine::{DocumentIndex, IndexConfig, IndexStats};
pub use error::IndexError;
pub use schema::Field;
pub use search::{SearchHit, SearchOptions, DEFAULT_LIMIT};
pub use segments::{Segments, SegmentKey, FORMAT_VERSION};
