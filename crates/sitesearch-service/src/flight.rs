//! Single-flight coordination for index builds.
//!
//! At most one flight is registered at a time. Its work runs on a spawned
//! task and its result is exposed through a cloneable shared future, so any
//! number of callers can await it and dropping a waiter never cancels the
//! build. Only an explicit abort through the flight's handle stops the task.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::task::AbortHandle;

use crate::error::LifecycleError;

pub type FlightResult<T> = Result<T, LifecycleError>;

/// Handle to a flight's eventual result.
pub type SharedFlight<T> = Shared<BoxFuture<'static, FlightResult<T>>>;

/// What a flight is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightKind {
    /// First population: snapshot, falling back to content
    Loading,
    /// Forced rebuild from content
    Rebuilding,
}

/// A registered flight.
pub(crate) struct Flight<T: Clone> {
    pub id: u64,
    pub kind: FlightKind,
    pub future: SharedFlight<T>,
    pub abort: AbortHandle,
}

/// Run `work` on its own task and share its result.
///
/// Aborting the returned handle resolves every waiter with `Aborted`.
pub(crate) fn spawn_shared<T, F>(work: F) -> (SharedFlight<T>, AbortHandle)
where
    T: Clone + Send + Sync + 'static,
    F: Future<Output = FlightResult<T>> + Send + 'static,
{
    let handle = tokio::spawn(work);
    let abort = handle.abort_handle();
    let future = async move {
        handle
            .await
            .unwrap_or_else(|e| Err(LifecycleError::Aborted(e.to_string())))
    }
    .boxed()
    .shared();
    (future, abort)
}

/// Mutex-guarded slot holding the current flight.
pub(crate) struct FlightSlot<T: Clone> {
    slot: Mutex<Option<Flight<T>>>,
    next_id: AtomicU64,
}

impl<T: Clone> Default for FlightSlot<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<T: Clone> FlightSlot<T> {
    pub fn lock(&self) -> MutexGuard<'_, Option<Flight<T>>> {
        self.slot.lock().expect("flight slot mutex poisoned")
    }

    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Kind of the registered flight, if any.
    pub fn kind(&self) -> Option<FlightKind> {
        self.lock().as_ref().map(|f| f.kind)
    }

    /// Run `complete` under the slot lock, then clear the slot if it still
    /// holds flight `id`. `complete` must not touch the slot.
    pub fn finish_with<R>(&self, id: u64, complete: impl FnOnce() -> R) -> R {
        let mut slot = self.lock();
        let outcome = complete();
        if slot.as_ref().map(|f| f.id) == Some(id) {
            *slot = None;
        }
        outcome
    }
}
