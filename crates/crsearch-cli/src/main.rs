//! Content search indexer
//!
//! # Usage
//!
//! ```bash
//! crsearch build --nodes nodes.json [--limit N]
//! crsearch cleanup
//! crsearch show-mapping
//! crsearch index-node IDENTIFIER --nodes nodes.json [--workspace W]
//! crsearch remove-node IDENTIFIER --nodes nodes.json
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/crsearch/config.toml)
//! 3. Environment variables (CRSEARCH_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use crsearch_cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}
