//! Index lifecycle and snapshot persistence.
//!
//! Provides:
//! - [`SnapshotManager`]: generation-scoped snapshots in a blob store
//! - [`IndexLifecycleManager`]: lazy load, single-flight rebuild and atomic
//!   publication of the current index

pub mod error;
pub mod flight;
pub mod lifecycle;
pub mod snapshot;

pub use error::{LifecycleError, SnapshotError};
pub use flight::FlightKind;
pub use lifecycle::{
    IndexGeneration, IndexLifecycleManager, IndexSource, LifecycleConfig, LifecycleState,
    LifecycleStatus,
};
pub use snapshot::{GenerationInfo, LoadedSnapshot, SaveReport, SnapshotManager, SnapshotManifest};
