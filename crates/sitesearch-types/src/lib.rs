//! # sitesearch-types
//!
//! Shared domain types for the site search service.
//!
//! - [`Document`]: one indexed content page
//! - [`Settings`]: layered configuration for the daemon and its components
//! - [`SiteSearchError`]: errors shared by the configuration and model layer

pub mod config;
pub mod document;
pub mod error;

pub use config::{
    BlobBackendKind, ContentSettings, LifecycleSettings, Settings, SnapshotSettings,
};
pub use document::Document;
pub use error::SiteSearchError;
