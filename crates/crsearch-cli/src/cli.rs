//! CLI argument parsing for the indexer.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// Content search indexer
///
/// Builds and maintains search indices for content nodes.
#[derive(Parser, Debug)]
#[command(name = "crsearch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/crsearch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// JSON file with the content nodes to index
    #[arg(short, long, global = true)]
    pub nodes: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Indexer commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a new index and publish it under the alias
    Build {
        /// Only index the first N nodes
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Remove indices of the alias that are no longer live
    Cleanup,

    /// Print the type mappings that would be applied
    ShowMapping,

    /// Index a single node in all its dimension variants
    IndexNode {
        /// Node identifier
        identifier: String,

        /// Workspace the change is published into
        #[arg(short, long)]
        workspace: Option<String>,
    },

    /// Remove a single node from the index
    RemoveNode {
        /// Node identifier
        identifier: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_build() {
        let cli = Cli::parse_from(["crsearch", "build"]);
        assert!(matches!(cli.command, Commands::Build { limit: None }));
    }

    #[test]
    fn test_cli_build_with_limit() {
        let cli = Cli::parse_from(["crsearch", "build", "--limit", "100"]);
        assert!(matches!(cli.command, Commands::Build { limit: Some(100) }));
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "crsearch",
            "cleanup",
            "--config",
            "/tmp/crsearch.toml",
            "--log-level",
            "debug",
            "--nodes",
            "nodes.json",
        ]);
        assert_eq!(cli.config, Some("/tmp/crsearch.toml".to_string()));
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert_eq!(cli.nodes, Some("nodes.json".to_string()));
        assert!(matches!(cli.command, Commands::Cleanup));
    }

    #[test]
    fn test_cli_show_mapping() {
        let cli = Cli::parse_from(["crsearch", "show-mapping"]);
        assert!(matches!(cli.command, Commands::ShowMapping));
    }

    #[test]
    fn test_cli_index_node() {
        let cli = Cli::parse_from(["crsearch", "index-node", "abc", "--workspace", "live"]);
        match cli.command {
            Commands::IndexNode {
                identifier,
                workspace,
            } => {
                assert_eq!(identifier, "abc");
                assert_eq!(workspace, Some("live".to_string()));
            }
            other => panic!("Expected IndexNode, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_remove_node_requires_identifier() {
        assert!(Cli::try_parse_from(["crsearch", "remove-node"]).is_err());
        let cli = Cli::parse_from(["crsearch", "remove-node", "abc"]);
        assert!(matches!(cli.command, Commands::RemoveNode { identifier } if identifier == "abc"));
    }
}
