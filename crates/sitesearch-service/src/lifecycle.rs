//! Index lifecycle: lazy load, rebuild and atomic publication.
//!
//! States:
//! - `Empty`: nothing published, no flight running
//! - `Loading`: first population in flight (snapshot, else content)
//! - `Warm`: an index is published and no flight is running
//! - `Rebuilding`: a rebuild from content is in flight
//!
//! Readers always see either the previous or the next complete index. A new
//! index is published only after it was fully built and persisted.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sitesearch_content::{ContentSync, PageFailure};
use sitesearch_index::{DocumentIndex, IndexConfig, SearchHit, SearchOptions};
use sitesearch_types::Settings;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::error::LifecycleError;
use crate::flight::{spawn_shared, Flight, FlightKind, FlightSlot, SharedFlight};
use crate::snapshot::SnapshotManager;

/// Default deadline for one flight.
pub const DEFAULT_REBUILD_TIMEOUT: Duration = Duration::from_secs(300);

/// Lifecycle tuning.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleConfig {
    /// Upper bound on a single load or rebuild
    pub rebuild_timeout: Duration,
    /// Settings for newly built indexes
    pub index: IndexConfig,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            rebuild_timeout: DEFAULT_REBUILD_TIMEOUT,
            index: IndexConfig::default(),
        }
    }
}

impl LifecycleConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            rebuild_timeout: settings.lifecycle.rebuild_timeout(),
            index: IndexConfig::default()
                .with_store_chunk_size(settings.snapshot.store_chunk_size),
        }
    }

    pub fn with_rebuild_timeout(mut self, timeout: Duration) -> Self {
        self.rebuild_timeout = timeout;
        self
    }
}

/// Where a published index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexSource {
    Snapshot,
    Content,
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Empty,
    Loading,
    Warm,
    Rebuilding,
}

/// A complete, immutable index and how it was produced.
#[derive(Debug)]
pub struct IndexGeneration {
    pub engine: DocumentIndex,
    pub source: IndexSource,
    pub built_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Pages skipped during a content build
    pub failures: Vec<PageFailure>,
    /// Snapshot generation holding this index, if persisted
    pub snapshot: Option<String>,
}

/// Status summary for the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleStatus {
    pub state: LifecycleState,
    pub documents: Option<usize>,
    pub source: Option<IndexSource>,
    pub built_at: Option<DateTime<Utc>>,
    pub build_ms: Option<u64>,
    pub snapshot: Option<String>,
    pub page_failures: usize,
    pub last_error: Option<String>,
}

struct LifecycleInner {
    config: LifecycleConfig,
    sync: ContentSync,
    snapshots: Option<SnapshotManager>,
    current: ArcSwapOption<IndexGeneration>,
    flights: FlightSlot<Arc<IndexGeneration>>,
    /// Bumped by `invalidate`; flights started under an older epoch are not
    /// published or persisted.
    epoch: AtomicU64,
    /// Set by `invalidate` until a fresh snapshot has been committed.
    snapshot_stale: AtomicBool,
    /// Serializes snapshot writes.
    persist: AsyncMutex<()>,
    last_error: Mutex<Option<String>>,
}

/// Owns the published index and coordinates every load and rebuild.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct IndexLifecycleManager {
    inner: Arc<LifecycleInner>,
}

impl IndexLifecycleManager {
    pub fn new(
        sync: ContentSync,
        snapshots: Option<SnapshotManager>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                config,
                sync,
                snapshots,
                current: ArcSwapOption::empty(),
                flights: FlightSlot::default(),
                epoch: AtomicU64::new(0),
                snapshot_stale: AtomicBool::new(false),
                persist: AsyncMutex::new(()),
                last_error: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.inner.config
    }

    pub fn snapshots(&self) -> Option<&SnapshotManager> {
        self.inner.snapshots.as_ref()
    }

    /// The published index, if any.
    pub fn current(&self) -> Option<Arc<IndexGeneration>> {
        self.inner.current.load_full()
    }

    /// Return the published index, loading it first if necessary.
    ///
    /// Concurrent callers share one load.
    pub async fn ensure_ready(&self) -> Result<Arc<IndexGeneration>, LifecycleError> {
        if let Some(current) = self.current() {
            return Ok(current);
        }

        let flight = {
            let mut slot = self.inner.flights.lock();
            if let Some(current) = self.current() {
                return Ok(current);
            }
            match slot.as_ref() {
                Some(flight) => flight.future.clone(),
                None => self.start_flight(&mut slot, FlightKind::Loading),
            }
        };

        flight.await
    }

    /// Build a fresh index from content, persist it, then publish it.
    ///
    /// Joins a rebuild already in flight. If a load is in flight, waits for it
    /// and then rebuilds. On failure the previously published index stays.
    pub async fn rebuild(&self) -> Result<Arc<IndexGeneration>, LifecycleError> {
        loop {
            let (flight, kind) = {
                let mut slot = self.inner.flights.lock();
                match slot.as_ref() {
                    Some(flight) => (flight.future.clone(), flight.kind),
                    None => (
                        self.start_flight(&mut slot, FlightKind::Rebuilding),
                        FlightKind::Rebuilding,
                    ),
                }
            };

            if kind == FlightKind::Rebuilding {
                return flight.await;
            }

            info!("Rebuild requested during load, waiting for load to finish");
            let _ = flight.await;
        }
    }

    /// Search the published index, loading it first if necessary.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, LifecycleError> {
        if query.trim().is_empty() {
            return Err(LifecycleError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }

        let generation = self.ensure_ready().await?;
        Ok(generation.engine.search(query, options))
    }

    /// Drop the published index and mark the snapshot as outdated.
    ///
    /// The next `ensure_ready` rebuilds from content. A flight already running
    /// is aborted and its waiters get `Aborted`; it is never published.
    pub fn invalidate(&self) {
        let detached = {
            let mut slot = self.inner.flights.lock();
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            self.inner.snapshot_stale.store(true, Ordering::SeqCst);
            self.inner.current.store(None);
            slot.take()
        };

        match detached {
            Some(flight) => {
                flight.abort.abort();
                info!(flight = flight.id, kind = ?flight.kind, "Index invalidated, flight aborted");
            }
            None => info!("Index invalidated"),
        }
    }

    pub fn state(&self) -> LifecycleState {
        match (self.inner.flights.kind(), self.current()) {
            (Some(FlightKind::Rebuilding), _) => LifecycleState::Rebuilding,
            (Some(FlightKind::Loading), _) => LifecycleState::Loading,
            (None, Some(_)) => LifecycleState::Warm,
            (None, None) => LifecycleState::Empty,
        }
    }

    pub fn status(&self) -> LifecycleStatus {
        let current = self.current();
        LifecycleStatus {
            state: self.state(),
            documents: current.as_ref().map(|g| g.engine.len()),
            source: current.as_ref().map(|g| g.source),
            built_at: current.as_ref().map(|g| g.built_at),
            build_ms: current.as_ref().map(|g| g.elapsed_ms),
            snapshot: current.as_ref().and_then(|g| g.snapshot.clone()),
            page_failures: current.as_ref().map(|g| g.failures.len()).unwrap_or(0),
            last_error: self.inner.last_error(),
        }
    }

    /// Register and spawn a new flight. Caller holds the slot lock.
    fn start_flight(
        &self,
        slot: &mut Option<Flight<Arc<IndexGeneration>>>,
        kind: FlightKind,
    ) -> SharedFlight<Arc<IndexGeneration>> {
        let id = self.inner.flights.next_id();
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let inner = self.inner.clone();

        info!(flight = id, kind = ?kind, "Starting index flight");
        let (future, abort) = spawn_shared(async move { inner.run_flight(id, kind, epoch).await });

        *slot = Some(Flight {
            id,
            kind,
            future: future.clone(),
            abort,
        });
        future
    }
}

impl LifecycleInner {
    fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .expect("last error mutex poisoned")
            .clone()
    }

    fn set_last_error(&self, error: Option<String>) {
        *self.last_error.lock().expect("last error mutex poisoned") = error;
    }

    fn is_current_epoch(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    async fn run_flight(
        self: Arc<Self>,
        id: u64,
        kind: FlightKind,
        epoch: u64,
    ) -> Result<Arc<IndexGeneration>, LifecycleError> {
        let timeout = self.config.rebuild_timeout;
        let result = match tokio::time::timeout(timeout, self.build(kind, epoch)).await {
            Ok(result) => result.map(Arc::new),
            Err(_) => Err(LifecycleError::Timeout(timeout)),
        };

        // `invalidate` bumps the epoch under the slot lock, so checking it and
        // publishing under the same lock cannot interleave with it.
        let published = self.flights.finish_with(id, || match &result {
            Ok(generation) if self.is_current_epoch(epoch) => {
                self.current.store(Some(generation.clone()));
                true
            }
            _ => false,
        });

        match &result {
            Ok(generation) if published => {
                self.set_last_error(None);
                info!(
                    flight = id,
                    kind = ?kind,
                    documents = generation.engine.len(),
                    source = ?generation.source,
                    elapsed_ms = generation.elapsed_ms,
                    "Published index"
                );
            }
            Ok(_) => {
                info!(flight = id, "Index invalidated during flight, not publishing");
            }
            Err(e) => {
                warn!(flight = id, kind = ?kind, error = %e, "Index flight failed");
                self.set_last_error(Some(e.to_string()));
            }
        }

        result
    }

    async fn build(&self, kind: FlightKind, epoch: u64) -> Result<IndexGeneration, LifecycleError> {
        if kind == FlightKind::Loading {
            if let Some(generation) = self.load_snapshot().await {
                return Ok(generation);
            }
        }
        self.build_from_content(epoch).await
    }

    /// Load the stored snapshot unless it is known to be outdated.
    async fn load_snapshot(&self) -> Option<IndexGeneration> {
        let snapshots = self.snapshots.as_ref()?;
        if self.snapshot_stale.load(Ordering::SeqCst) {
            info!("Snapshot marked stale, rebuilding from content");
            return None;
        }

        let start = Instant::now();
        match snapshots.load().await {
            Ok(Some(loaded)) => Some(IndexGeneration {
                engine: loaded.engine,
                source: IndexSource::Snapshot,
                built_at: Utc::now(),
                elapsed_ms: start.elapsed().as_millis() as u64,
                failures: Vec::new(),
                snapshot: Some(loaded.generation),
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to load snapshot, rebuilding from content");
                None
            }
        }
    }

    async fn build_from_content(&self, epoch: u64) -> Result<IndexGeneration, LifecycleError> {
        let start = Instant::now();
        let outcome = self.sync.fetch_all().await?;

        if outcome.documents.is_empty() && !outcome.failures.is_empty() {
            return Err(LifecycleError::Fetch(format!(
                "all {} pages failed to fetch",
                outcome.failures.len()
            )));
        }

        let mut engine = DocumentIndex::new(self.config.index);
        engine.add_all(outcome.documents);
        engine.verify()?;

        let snapshot = self.persist(&engine, epoch).await;

        Ok(IndexGeneration {
            engine,
            source: IndexSource::Content,
            built_at: Utc::now(),
            elapsed_ms: start.elapsed().as_millis() as u64,
            failures: outcome.failures,
            snapshot,
        })
    }

    /// Save a snapshot unless the flight was invalidated. Returns the committed
    /// generation.
    async fn persist(&self, engine: &DocumentIndex, epoch: u64) -> Option<String> {
        let snapshots = self.snapshots.as_ref()?;
        let _guard = self.persist.lock().await;

        if !self.is_current_epoch(epoch) {
            info!("Index invalidated during build, skipping snapshot");
            return None;
        }

        let report = snapshots.save(engine).await;
        if !report.committed {
            return None;
        }
        if self.is_current_epoch(epoch) {
            self.snapshot_stale.store(false, Ordering::SeqCst);
        }
        Some(report.generation)
    }
}
