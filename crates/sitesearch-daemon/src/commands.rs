//! Command implementations for the search daemon.
//!
//! Handles:
//! - serve: load config, wire the lifecycle manager, run the HTTP server
//! - search / rebuild: one-shot operations printing JSON
//! - snapshot inspect: list stored generations

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use sitesearch_content::{AgilityConfig, AgilityContentSource, ContentSync};
use sitesearch_index::{Field, SearchOptions};
use sitesearch_service::{IndexLifecycleManager, LifecycleConfig, SnapshotManager};
use sitesearch_storage::{BlobStore, HttpBlobStore, HttpBlobStoreConfig, ObjectStoreBackend};
use sitesearch_types::{BlobBackendKind, Settings};

use crate::server::{run_server_with_shutdown, AppState};

/// Load settings and apply the CLI log level override.
fn load_settings(config_path: Option<&str>, log_level_override: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level. Logs go to stderr so command output stays parseable.
fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Open the configured blob backend, if persistence is enabled.
pub fn build_blob_store(settings: &Settings) -> Result<Option<Arc<dyn BlobStore>>> {
    let store: Arc<dyn BlobStore> = match settings.snapshot.backend {
        BlobBackendKind::None => return Ok(None),
        BlobBackendKind::Memory => Arc::new(ObjectStoreBackend::memory()),
        BlobBackendKind::Local => {
            let path = settings.expanded_snapshot_path();
            Arc::new(
                ObjectStoreBackend::local(&path)
                    .with_context(|| format!("Failed to open snapshot directory {:?}", path))?,
            )
        }
        BlobBackendKind::Http => {
            let base_url = settings
                .snapshot
                .http_base_url
                .clone()
                .context("snapshot.http_base_url is required for the http backend")?;
            let token = settings.snapshot.http_token.clone().unwrap_or_default();
            Arc::new(
                HttpBlobStore::new(HttpBlobStoreConfig::new(base_url, token))
                    .context("Failed to create HTTP blob store")?,
            )
        }
    };
    Ok(Some(store))
}

/// Wire content source, snapshot store and lifecycle manager from settings.
pub fn build_lifecycle(settings: &Settings) -> Result<IndexLifecycleManager> {
    let agility = AgilityConfig::from_settings(&settings.content)
        .context("Invalid content source configuration")?;
    let source = AgilityContentSource::new(agility).context("Failed to create content source")?;
    let sync = ContentSync::new(Arc::new(source)).with_page_timeout(settings.content.page_timeout());

    let config = LifecycleConfig::from_settings(settings);
    let snapshots = build_blob_store(settings)?.map(|store| {
        SnapshotManager::new(store, settings.snapshot.prefix.clone()).with_index_config(config.index)
    });

    match &snapshots {
        Some(manager) => info!(
            backend = manager.backend(),
            prefix = manager.prefix(),
            "Snapshot persistence enabled"
        ),
        None => warn!("Snapshot persistence disabled, cold starts rebuild from content"),
    }

    Ok(IndexLifecycleManager::new(sync, snapshots, config))
}

/// Parse a comma-separated field list.
pub fn parse_field_list(raw: &str) -> Result<Vec<Field>> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            Field::parse(name).with_context(|| {
                format!("Unknown field '{}' (expected title, content or url)", name)
            })
        })
        .collect()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Start the HTTP server.
///
/// 1. Load configuration (defaults -> file -> env -> CLI)
/// 2. Wire the lifecycle manager
/// 3. Optionally warm the index in the background
/// 4. Serve until SIGINT/SIGTERM
pub async fn start_server(
    config_path: Option<&str>,
    host_override: Option<&str>,
    port_override: Option<u16>,
    log_level_override: Option<&str>,
) -> Result<()> {
    let mut settings = load_settings(config_path, log_level_override)?;
    if let Some(host) = host_override {
        settings.http_host = host.to_string();
    }
    if let Some(port) = port_override {
        settings.http_port = port;
    }
    init_logging(&settings)?;

    info!("Site search daemon starting...");
    info!("  HTTP address: {}", settings.http_addr());
    info!("  Snapshot backend: {:?}", settings.snapshot.backend);
    info!("  Log level: {}", settings.log_level);

    let lifecycle = build_lifecycle(&settings)?;

    if settings.lifecycle.warm_on_start {
        let warm = lifecycle.clone();
        tokio::spawn(async move {
            match warm.ensure_ready().await {
                Ok(generation) => info!(
                    documents = generation.engine.len(),
                    source = ?generation.source,
                    "Index warmed on start"
                ),
                Err(e) => warn!(error = %e, "Warm-up failed, will retry on first query"),
            }
        });
    }

    let addr: SocketAddr = settings
        .http_addr()
        .parse()
        .with_context(|| format!("Invalid HTTP address: {}", settings.http_addr()))?;

    run_server_with_shutdown(addr, AppState::new(lifecycle), shutdown_signal())
        .await
        .context("HTTP server error")
}

/// Run one query and print the hits as JSON.
pub async fn run_search(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    query: &str,
    fields: Option<&str>,
    limit: usize,
) -> Result<()> {
    let settings = load_settings(config_path, log_level_override)?;
    init_logging(&settings)?;

    let fields = fields.map(parse_field_list).transpose()?.unwrap_or_default();
    let options = SearchOptions::new().with_fields(fields).with_limit(limit);

    let lifecycle = build_lifecycle(&settings)?;
    let hits = lifecycle.search(query, &options).await?;

    let output: Vec<serde_json::Value> = hits
        .iter()
        .map(|hit| {
            serde_json::json!({
                "id": hit.document.id,
                "title": hit.document.title,
                "url": hit.document.url,
                "score": hit.score,
                "fields": hit.fields.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Rebuild from content, persist a snapshot, and print the new status.
pub async fn run_rebuild(config_path: Option<&str>, log_level_override: Option<&str>) -> Result<()> {
    let settings = load_settings(config_path, log_level_override)?;
    init_logging(&settings)?;

    let lifecycle = build_lifecycle(&settings)?;
    lifecycle.rebuild().await.context("Rebuild failed")?;

    println!("{}", serde_json::to_string_pretty(&lifecycle.status())?);
    Ok(())
}

/// List stored snapshot generations, newest first.
pub async fn inspect_snapshots(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<()> {
    let settings = load_settings(config_path, log_level_override)?;
    init_logging(&settings)?;

    let Some(store) = build_blob_store(&settings)? else {
        anyhow::bail!("Snapshot persistence is disabled (snapshot.backend = \"none\")");
    };
    let manager = SnapshotManager::new(store, settings.snapshot.prefix.clone());
    let generations = manager
        .inspect()
        .await
        .context("Failed to list snapshot generations")?;

    println!("{}", serde_json::to_string_pretty(&generations)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_field_list() {
        assert_eq!(
            parse_field_list("title, content").unwrap(),
            vec![Field::Title, Field::Content]
        );
        assert!(parse_field_list("").unwrap().is_empty());
        assert!(parse_field_list("title,body").is_err());
    }

    #[test]
    fn test_blob_store_disabled() {
        let mut settings = Settings::default();
        settings.snapshot.backend = BlobBackendKind::None;
        assert!(build_blob_store(&settings).unwrap().is_none());
    }

    #[test]
    fn test_local_blob_store_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("snapshots");

        let mut settings = Settings::default();
        settings.snapshot.backend = BlobBackendKind::Local;
        settings.snapshot.local_path = dir.to_string_lossy().to_string();

        let store = build_blob_store(&settings).unwrap().unwrap();
        assert_eq!(store.name(), "local");
        assert!(dir.is_dir());
    }

    #[test]
    fn test_http_blob_store_requires_base_url() {
        let mut settings = Settings::default();
        settings.snapshot.backend = BlobBackendKind::Http;
        assert!(build_blob_store(&settings).is_err());

        settings.snapshot.http_base_url = Some("https://blob.example.com".to_string());
        assert!(build_blob_store(&settings).unwrap().is_some());
    }

    #[test]
    fn test_lifecycle_requires_content_credentials() {
        let mut settings = Settings::default();
        settings.snapshot.backend = BlobBackendKind::None;
        assert!(build_lifecycle(&settings).is_err());

        settings.content.guid = Some("abc123".to_string());
        settings.content.api_key = Some("key".to_string());
        let lifecycle = build_lifecycle(&settings).unwrap();
        assert!(lifecycle.snapshots().is_none());
    }
}
