//! Site search daemon library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (serve, search, rebuild, snapshot)
//! - `server`: axum router and HTTP handlers

pub mod cli;
pub mod commands;
pub mod server;

pub use cli::{Cli, Commands, SnapshotCommands};
pub use commands::{
    build_blob_store, build_lifecycle, inspect_snapshots, run_rebuild, run_search, start_server,
};
pub use server::{create_router, run_server_with_shutdown, AppState, ApiError};
