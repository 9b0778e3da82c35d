//! Snapshot persistence for the document index.
//!
//! Layout under the configured prefix:
//!
//! ```text
//! {prefix}/{generation}/{segment}.json     one blob per exported segment
//! {prefix}/{generation}/_manifest.json     commit marker, written last
//! ```
//!
//! A generation is a ULID, so generations sort by creation time. A generation
//! is complete when its manifest exists and every segment it names is listed.
//! Readers only load complete generations. Once a manifest is written, the
//! generations older than it are removed. Newer ones may belong to another
//! writer that is still uploading, so they are left alone.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use sitesearch_index::{DocumentIndex, IndexConfig, Segments, FORMAT_VERSION};
use sitesearch_storage::BlobStore;
use tracing::{debug, info, warn};
use ulid::{Generator, Ulid};

use crate::error::SnapshotError;

/// Blob name of the commit marker inside a generation.
pub const MANIFEST_SEGMENT: &str = "_manifest";

/// Contents of `_manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub generation: String,
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub document_count: usize,
    /// Segment keys, without prefix or extension
    pub segments: Vec<String>,
}

/// Outcome of [`SnapshotManager::save`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub generation: String,
    pub segments_written: usize,
    /// Segment keys that could not be written
    pub segments_failed: Vec<String>,
    /// Blobs of older generations removed after commit
    pub stale_deleted: usize,
    /// Whether the manifest was written
    pub committed: bool,
}

/// A snapshot restored into a fresh index.
#[derive(Debug)]
pub struct LoadedSnapshot {
    pub generation: String,
    pub manifest: SnapshotManifest,
    pub engine: DocumentIndex,
}

/// One generation found under the prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationInfo {
    pub generation: String,
    pub complete: bool,
    /// Segment blobs present (manifest excluded)
    pub segments: usize,
    pub document_count: Option<usize>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Blobs of one generation, keyed by segment name.
#[derive(Debug, Default)]
struct GenerationListing {
    segments: HashMap<String, String>,
    manifest_url: Option<String>,
}

/// Reads and writes index snapshots in a [`BlobStore`].
pub struct SnapshotManager {
    store: Arc<dyn BlobStore>,
    prefix: String,
    index_config: IndexConfig,
    ids: Mutex<Generator>,
}

impl SnapshotManager {
    pub fn new(store: Arc<dyn BlobStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into().trim_matches('/').to_string(),
            index_config: IndexConfig::default(),
            ids: Mutex::new(Generator::new()),
        }
    }

    pub fn with_index_config(mut self, config: IndexConfig) -> Self {
        self.index_config = config;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    /// Next generation id, strictly increasing within this manager.
    fn next_generation(&self) -> String {
        let mut ids = self.ids.lock().expect("generation id mutex poisoned");
        ids.generate().unwrap_or_else(|_| Ulid::new()).to_string()
    }

    fn blob_key(&self, generation: &str, segment: &str) -> String {
        format!("{}/{}/{}.json", self.prefix, generation, segment)
    }

    /// Split a listed key into `(generation, segment)`.
    fn parse_key<'a>(&self, key: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = key.strip_prefix(self.prefix.as_str())?.strip_prefix('/')?;
        let (generation, file) = rest.split_once('/')?;
        let segment = file.strip_suffix(".json")?;
        if generation.is_empty() || segment.is_empty() || segment.contains('/') {
            return None;
        }
        Some((generation, segment))
    }

    async fn listing(&self) -> Result<BTreeMap<String, GenerationListing>, SnapshotError> {
        let entries = self.store.list(&self.prefix).await?;
        let mut generations: BTreeMap<String, GenerationListing> = BTreeMap::new();

        for entry in entries {
            let Some((generation, segment)) = self.parse_key(&entry.key) else {
                debug!(key = %entry.key, "Ignoring unrecognised blob");
                continue;
            };
            let listing = generations.entry(generation.to_string()).or_default();
            if segment == MANIFEST_SEGMENT {
                listing.manifest_url = Some(entry.url.clone());
            } else {
                listing.segments.insert(segment.to_string(), entry.url.clone());
            }
        }

        Ok(generations)
    }

    async fn read_manifest(
        &self,
        generation: &str,
        url: &str,
    ) -> Result<SnapshotManifest, SnapshotError> {
        let bytes = self.store.get(url).await?;
        serde_json::from_slice(&bytes).map_err(|e| SnapshotError::Manifest {
            generation: generation.to_string(),
            message: e.to_string(),
        })
    }

    /// Persist `engine` as a new generation.
    ///
    /// Never fails: write errors are logged and reported. The manifest is only
    /// written when every segment was stored, and older generations are only
    /// removed after that.
    pub async fn save(&self, engine: &DocumentIndex) -> SaveReport {
        let start = Instant::now();
        let generation = self.next_generation();
        let mut report = SaveReport {
            generation: generation.clone(),
            segments_written: 0,
            segments_failed: Vec::new(),
            stale_deleted: 0,
            committed: false,
        };

        let segments: Segments = match engine.export_segments() {
            Ok(segments) => segments,
            Err(e) => {
                warn!(error = %e, "Failed to export index segments");
                return report;
            }
        };

        let writes = segments.iter().map(|(segment, payload)| {
            let key = self.blob_key(&generation, segment);
            let data = Bytes::from(payload.clone());
            async move {
                let result = self.store.put(&key, data).await;
                (segment.clone(), key, result)
            }
        });

        for (segment, key, result) in join_all(writes).await {
            match result {
                Ok(()) => {
                    debug!(key = %key, "Wrote snapshot segment");
                    report.segments_written += 1;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to write snapshot segment");
                    report.segments_failed.push(segment);
                }
            }
        }

        if !report.segments_failed.is_empty() {
            warn!(
                generation = %generation,
                failed = report.segments_failed.len(),
                "Snapshot incomplete, keeping previous generation"
            );
            return report;
        }

        let manifest = SnapshotManifest {
            generation: generation.clone(),
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            document_count: engine.len(),
            segments: segments.keys().cloned().collect(),
        };
        let manifest_bytes = match serde_json::to_vec(&manifest) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to encode snapshot manifest");
                return report;
            }
        };
        let manifest_key = self.blob_key(&generation, MANIFEST_SEGMENT);
        if let Err(e) = self.store.put(&manifest_key, Bytes::from(manifest_bytes)).await {
            warn!(key = %manifest_key, error = %e, "Failed to write snapshot manifest");
            return report;
        }
        report.committed = true;

        report.stale_deleted = self.delete_older_generations(&generation).await;

        info!(
            generation = %generation,
            segments = report.segments_written,
            documents = manifest.document_count,
            stale_deleted = report.stale_deleted,
            elapsed_ms = start.elapsed().as_millis() as u64,
            backend = self.store.name(),
            "Saved index snapshot"
        );
        report
    }

    /// Remove every blob of a generation older than `keep`. Returns how many
    /// blobs were deleted; failures are logged.
    async fn delete_older_generations(&self, keep: &str) -> usize {
        let entries = match self.store.list(&self.prefix).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to list snapshot blobs for cleanup");
                return 0;
            }
        };

        let stale: Vec<String> = entries
            .into_iter()
            .filter(|entry| {
                self.parse_key(&entry.key)
                    .map(|(generation, _)| generation < keep)
                    .unwrap_or(false)
            })
            .map(|entry| entry.url)
            .collect();

        if stale.is_empty() {
            return 0;
        }

        match self.store.delete(&stale).await {
            Ok(()) => stale.len(),
            Err(e) => {
                warn!(count = stale.len(), error = %e, "Failed to delete stale snapshot blobs");
                0
            }
        }
    }

    /// Load the newest complete generation.
    ///
    /// Returns `Ok(None)` when there is nothing to load. The engine is only
    /// returned after every segment was fetched, imported and verified.
    pub async fn load(&self) -> Result<Option<LoadedSnapshot>, SnapshotError> {
        let start = Instant::now();
        let generations = self.listing().await?;

        for (generation, listing) in generations.iter().rev() {
            let Some(manifest_url) = &listing.manifest_url else {
                debug!(generation = %generation, "Skipping uncommitted generation");
                continue;
            };

            let manifest = match self.read_manifest(generation, manifest_url).await {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(generation = %generation, error = %e, "Skipping unreadable manifest");
                    continue;
                }
            };
            let missing: Vec<&String> = manifest
                .segments
                .iter()
                .filter(|s| !listing.segments.contains_key(*s))
                .collect();
            if !missing.is_empty() {
                warn!(
                    generation = %generation,
                    missing = missing.len(),
                    "Skipping incomplete generation"
                );
                continue;
            }

            let fetches = manifest.segments.iter().map(|segment| {
                let url = &listing.segments[segment];
                async move {
                    let bytes = self.store.get(url).await?;
                    Ok::<_, SnapshotError>((segment.clone(), bytes))
                }
            });
            let payloads = try_join_all(fetches).await?;

            let mut engine = DocumentIndex::new(self.index_config);
            for (segment, bytes) in &payloads {
                engine.import_segment(segment, bytes)?;
            }
            engine.verify()?;

            if engine.len() != manifest.document_count {
                return Err(SnapshotError::Manifest {
                    generation: generation.clone(),
                    message: format!(
                        "manifest lists {} documents, segments hold {}",
                        manifest.document_count,
                        engine.len()
                    ),
                });
            }

            info!(
                generation = %generation,
                documents = engine.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Loaded index snapshot"
            );
            return Ok(Some(LoadedSnapshot {
                generation: generation.clone(),
                manifest,
                engine,
            }));
        }

        info!(prefix = %self.prefix, "No complete snapshot found");
        Ok(None)
    }

    /// Describe every generation under the prefix, newest first.
    pub async fn inspect(&self) -> Result<Vec<GenerationInfo>, SnapshotError> {
        let generations = self.listing().await?;
        let mut infos = Vec::with_capacity(generations.len());

        for (generation, listing) in generations.iter().rev() {
            let manifest = match &listing.manifest_url {
                Some(url) => match self.read_manifest(generation, url).await {
                    Ok(manifest) => Some(manifest),
                    Err(e) => {
                        warn!(generation = %generation, error = %e, "Unreadable manifest");
                        None
                    }
                },
                None => None,
            };

            let complete = manifest
                .as_ref()
                .map(|m| m.segments.iter().all(|s| listing.segments.contains_key(s)))
                .unwrap_or(false);

            infos.push(GenerationInfo {
                generation: generation.clone(),
                complete,
                segments: listing.segments.len(),
                document_count: manifest.as_ref().map(|m| m.document_count),
                created_at: manifest.as_ref().map(|m| m.created_at),
            });
        }

        Ok(infos)
    }
}
