//! Command line driver for the content search indexer.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (build, cleanup, show-mapping,
//!   index-node, remove-node)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{build, cleanup, index_node, init_logging, load_settings, remove_node, run, show_mapping};
