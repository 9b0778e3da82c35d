//! Configuration loading for the site search daemon.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/sitesearch/config.toml`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::SiteSearchError;

/// Content source (headless CMS) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSettings {
    /// Instance GUID of the CMS tenant
    #[serde(default)]
    pub guid: Option<String>,

    /// Fetch or preview API key (usually supplied via env var)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Read unpublished (preview) content
    #[serde(default)]
    pub preview: bool,

    /// Override for the API base URL; derived from the GUID when absent
    #[serde(default)]
    pub base_url: Option<String>,

    /// Locale code, e.g. "en-us"
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Sitemap channel name
    #[serde(default = "default_channel")]
    pub channel: String,

    /// How deep linked content is expanded when fetching a page
    #[serde(default = "default_content_link_depth")]
    pub content_link_depth: u32,

    /// Per-page fetch timeout in seconds
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,
}

fn default_locale() -> String {
    "en-us".to_string()
}

fn default_channel() -> String {
    "website".to_string()
}

fn default_content_link_depth() -> u32 {
    4
}

fn default_page_timeout_secs() -> u64 {
    10
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            guid: None,
            api_key: None,
            preview: false,
            base_url: None,
            locale: default_locale(),
            channel: default_channel(),
            content_link_depth: default_content_link_depth(),
            page_timeout_secs: default_page_timeout_secs(),
        }
    }
}

impl ContentSettings {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }
}

/// Which blob backend holds index snapshots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlobBackendKind {
    /// No persistence: every cold start rebuilds from the content source
    None,
    /// Process-local memory (tests and demos)
    Memory,
    /// Directory on local disk
    #[default]
    Local,
    /// Remote blob service over HTTP
    Http,
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSettings {
    #[serde(default)]
    pub backend: BlobBackendKind,

    /// Key prefix under which all snapshot generations live
    #[serde(default = "default_snapshot_prefix")]
    pub prefix: String,

    /// Directory for the local backend
    #[serde(default = "default_snapshot_path")]
    pub local_path: String,

    /// Base URL for the HTTP backend
    #[serde(default)]
    pub http_base_url: Option<String>,

    /// Read/write token for the HTTP backend
    #[serde(default)]
    pub http_token: Option<String>,

    /// Documents per exported store segment
    #[serde(default = "default_store_chunk_size")]
    pub store_chunk_size: usize,
}

fn default_snapshot_prefix() -> String {
    "search-index".to_string()
}

fn default_snapshot_path() -> String {
    ProjectDirs::from("", "", "sitesearch")
        .map(|p| p.data_local_dir().join("snapshots"))
        .unwrap_or_else(|| PathBuf::from("./snapshots"))
        .to_string_lossy()
        .to_string()
}

fn default_store_chunk_size() -> usize {
    256
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            backend: BlobBackendKind::default(),
            prefix: default_snapshot_prefix(),
            local_path: default_snapshot_path(),
            http_base_url: None,
            http_token: None,
            store_chunk_size: default_store_chunk_size(),
        }
    }
}

/// Index lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleSettings {
    /// Upper bound on a single load or rebuild, in seconds
    #[serde(default = "default_rebuild_timeout_secs")]
    pub rebuild_timeout_secs: u64,

    /// Load the index when the server starts instead of on the first query
    #[serde(default = "default_true")]
    pub warm_on_start: bool,
}

fn default_rebuild_timeout_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            rebuild_timeout_secs: default_rebuild_timeout_secs(),
            warm_on_start: true,
        }
    }
}

impl LifecycleSettings {
    pub fn rebuild_timeout(&self) -> Duration {
        Duration::from_secs(self.rebuild_timeout_secs)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.rebuild_timeout_secs == 0 {
            return Err("rebuild_timeout_secs must be > 0".to_string());
        }
        Ok(())
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// HTTP server host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub content: ContentSettings,

    #[serde(default)]
    pub snapshot: SnapshotSettings,

    #[serde(default)]
    pub lifecycle: LifecycleSettings,
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    3030
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_host: default_http_host(),
            http_port: default_http_port(),
            log_level: default_log_level(),
            content: ContentSettings::default(),
            snapshot: SnapshotSettings::default(),
            lifecycle: LifecycleSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/sitesearch/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (SITESEARCH_*, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, SiteSearchError> {
        let config_dir = ProjectDirs::from("", "", "sitesearch")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("http_host", default_http_host())
            .map_err(|e| SiteSearchError::Config(e.to_string()))?
            .set_default("http_port", default_http_port() as i64)
            .map_err(|e| SiteSearchError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| SiteSearchError::Config(e.to_string()))?
            .set_default("snapshot.prefix", default_snapshot_prefix())
            .map_err(|e| SiteSearchError::Config(e.to_string()))?
            .set_default("snapshot.local_path", default_snapshot_path())
            .map_err(|e| SiteSearchError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SITESEARCH_HTTP_PORT, SITESEARCH_CONTENT__API_KEY, SITESEARCH_SNAPSHOT__BACKEND, ...
        builder = builder.add_source(
            Environment::with_prefix("SITESEARCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| SiteSearchError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| SiteSearchError::Config(e.to_string()))?;

        settings
            .lifecycle
            .validate()
            .map_err(SiteSearchError::Config)?;

        Ok(settings)
    }

    /// Socket address string for the HTTP server
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Expand ~ in the local snapshot path
    pub fn expanded_snapshot_path(&self) -> PathBuf {
        if let Some(rest) = self.snapshot.local_path.strip_prefix("~/") {
            if let Some(dirs) = directories::BaseDirs::new() {
                return dirs.home_dir().join(rest);
            }
        }
        PathBuf::from(&self.snapshot.local_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.http_port, 3030);
        assert_eq!(settings.http_host, "0.0.0.0");
        assert_eq!(settings.content.channel, "website");
        assert_eq!(settings.content.content_link_depth, 4);
        assert_eq!(settings.snapshot.prefix, "search-index");
        assert_eq!(settings.snapshot.backend, BlobBackendKind::Local);
    }

    #[test]
    fn test_load_with_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.snapshot.store_chunk_size, 256);
        assert!(settings.lifecycle.rebuild_timeout_secs > 0);
    }

    #[test]
    fn test_http_addr() {
        let settings = Settings::default();
        assert_eq!(settings.http_addr(), "0.0.0.0:3030");
    }

    #[test]
    fn test_lifecycle_validation() {
        let mut lifecycle = LifecycleSettings::default();
        assert!(lifecycle.validate().is_ok());

        lifecycle.rebuild_timeout_secs = 0;
        assert!(lifecycle.validate().is_err());
    }

    #[test]
    fn test_backend_kind_serialization() {
        let json = serde_json::to_string(&BlobBackendKind::Http).unwrap();
        assert_eq!(json, "\"http\"");
        let decoded: BlobBackendKind = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(decoded, BlobBackendKind::None);
    }

    #[test]
    fn test_expanded_snapshot_path_plain() {
        let mut settings = Settings::default();
        settings.snapshot.local_path = "/var/lib/sitesearch".to_string();
        assert_eq!(
            settings.expanded_snapshot_path(),
            PathBuf::from("/var/lib/sitesearch")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "http_port = 8088\n[snapshot]\nbackend = \"none\"\nprefix = \"idx\"\n",
        )
        .unwrap();

        let settings = Settings::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.http_port, 8088);
        assert_eq!(settings.snapshot.backend, BlobBackendKind::None);
        assert_eq!(settings.snapshot.prefix, "idx");
    }
}
