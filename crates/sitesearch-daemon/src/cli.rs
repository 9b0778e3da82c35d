//! CLI argument parsing for the search daemon.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// Site Search Daemon
///
/// Serves full-text search over a headless-CMS site and keeps the index
/// warm through snapshots.
#[derive(Parser, Debug)]
#[command(name = "sitesearch-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/sitesearch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override HTTP port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Run one query and print the results as JSON
    Search {
        /// Query text
        query: String,

        /// Restrict to fields (comma-separated: title,content,url)
        #[arg(short, long)]
        fields: Option<String>,

        /// Maximum results
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Rebuild the index from content and write a snapshot
    Rebuild,

    /// Snapshot maintenance
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },
}

/// Snapshot subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SnapshotCommands {
    /// List stored snapshot generations, newest first
    Inspect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_serve() {
        let cli = Cli::parse_from(["sitesearch-daemon", "serve", "--port", "8080"]);
        match cli.command {
            Commands::Serve { port, host } => {
                assert_eq!(port, Some(8080));
                assert!(host.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_search() {
        let cli = Cli::parse_from([
            "sitesearch-daemon",
            "search",
            "our team",
            "--fields",
            "title,content",
            "-n",
            "5",
        ]);
        match cli.command {
            Commands::Search {
                query,
                fields,
                limit,
            } => {
                assert_eq!(query, "our team");
                assert_eq!(fields.as_deref(), Some("title,content"));
                assert_eq!(limit, 5);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "sitesearch-daemon",
            "rebuild",
            "--config",
            "/tmp/site.toml",
            "-l",
            "debug",
        ]);
        assert!(matches!(cli.command, Commands::Rebuild));
        assert_eq!(cli.config.as_deref(), Some("/tmp/site.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_cli_snapshot_inspect() {
        let cli = Cli::parse_from(["sitesearch-daemon", "snapshot", "inspect"]);
        assert!(matches!(
            cli.command,
            Commands::Snapshot {
                command: SnapshotCommands::Inspect
            }
        ));
    }
}
