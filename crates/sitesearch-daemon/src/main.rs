//! Site Search Daemon
//!
//! Full-text search over a headless-CMS site, served over HTTP.
//!
//! # Usage
//!
//! ```bash
//! sitesearch-daemon serve [--port PORT] [--host HOST]
//! sitesearch-daemon search "query" [--fields title,content] [--limit N]
//! sitesearch-daemon rebuild
//! sitesearch-daemon snapshot inspect
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/sitesearch/config.toml)
//! 3. Environment variables (SITESEARCH_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use sitesearch_daemon::{
    inspect_snapshots, run_rebuild, run_search, start_server, Cli, Commands, SnapshotCommands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let log_level = cli.log_level.as_deref();

    match cli.command {
        Commands::Serve { port, host } => {
            start_server(config, host.as_deref(), port, log_level).await?;
        }
        Commands::Search {
            query,
            fields,
            limit,
        } => {
            run_search(config, log_level, &query, fields.as_deref(), limit).await?;
        }
        Commands::Rebuild => {
            run_rebuild(config, log_level).await?;
        }
        Commands::Snapshot { command } => match command {
            SnapshotCommands::Inspect => inspect_snapshots(config, log_level).await?,
        },
    }

    Ok(())
}
