//! Command implementations.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use crsearch_client::{HttpBackend, HttpBackendConfig, SearchBackend};
use crsearch_indexing::{
    rebuild_index, ConfiguredExtractor, ConfiguredMappingBuilder, FlushReport,
    LoggingProgressCallback, MappingBuilder, NodeIndexer, RebuildConfig, RebuildResult,
    StaticDimensions, StaticNodeSource,
};
use crsearch_types::{IndexHandle, Settings};

use crate::cli::{Cli, Commands};

/// Load settings, applying the CLI log level override.
pub fn load_settings(config_path: Option<&str>, log_level_override: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber; `RUST_LOG` wins over `log_level`.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn load_nodes(path: Option<&str>, settings: &Settings) -> Result<StaticNodeSource> {
    let Some(path) = path else {
        bail!("This command needs a node file (--nodes FILE)");
    };
    let source = StaticNodeSource::load(Path::new(path), settings)
        .with_context(|| format!("Failed to load nodes from {}", path))?;
    info!(path = %path, nodes = source.len(), "Loaded nodes");
    Ok(source)
}

fn node_indexer(
    settings: &Settings,
    backend: Arc<dyn SearchBackend>,
    source: Arc<StaticNodeSource>,
) -> NodeIndexer {
    NodeIndexer::new(
        backend,
        source,
        Arc::new(StaticDimensions::from_settings(settings)),
        Arc::new(ConfiguredExtractor::from_settings(settings)),
        settings,
    )
}

/// Build a fresh index from `source` and publish it.
pub async fn build(
    settings: &Settings,
    backend: Arc<dyn SearchBackend>,
    source: StaticNodeSource,
    config: RebuildConfig,
) -> Result<RebuildResult> {
    let mut indexer = node_indexer(settings, backend, Arc::new(source));
    let mappings = ConfiguredMappingBuilder::from_settings(settings);
    let progress = Arc::new(LoggingProgressCallback::new(settings.indexing.progress_interval));

    let result = rebuild_index(&mut indexer, &mappings, &config, progress)
        .await
        .context("Index build failed")?;
    info!(
        index = %result.index_name,
        nodes = result.progress.total_processed,
        failed = result.progress.failed_items,
        elapsed_ms = result.elapsed_ms,
        "Build finished"
    );
    Ok(result)
}

/// Remove indices of the alias that are no longer live.
pub async fn cleanup(settings: &Settings, backend: Arc<dyn SearchBackend>) -> Result<Vec<String>> {
    let indexer = node_indexer(settings, backend, Arc::new(StaticNodeSource::default()));
    indexer
        .remove_old_indices()
        .await
        .context("Failed to remove old indices")
}

/// Write every type mapping, then mapping errors and warnings.
pub fn show_mapping(settings: &Settings, out: &mut dyn Write) -> Result<()> {
    let builder = ConfiguredMappingBuilder::from_settings(settings);
    let collection = builder.build(&IndexHandle::new(settings.index_name.clone(), None));

    for mapping in &collection.mappings {
        writeln!(out, "{}", serde_json::to_string_pretty(&mapping.as_value())?)?;
        writeln!(out)?;
    }
    writeln!(out, "------------")?;

    if collection.has_errors() {
        writeln!(out, "Mapping Errors")?;
        for error in &collection.errors {
            writeln!(out, "{}", error)?;
        }
    }
    if collection.has_warnings() {
        writeln!(out, "Mapping Warnings")?;
        for warning in &collection.warnings {
            writeln!(out, "{}", warning)?;
        }
    }
    Ok(())
}

/// Index one node (all dimension variants) into the live alias and flush.
pub async fn index_node(
    settings: &Settings,
    backend: Arc<dyn SearchBackend>,
    source: StaticNodeSource,
    identifier: &str,
    workspace: Option<&str>,
) -> Result<FlushReport> {
    let variants = source.variants(identifier);
    let preferred = workspace.unwrap_or(&settings.live_workspace);
    let Some(node) = variants
        .iter()
        .find(|node| node.workspace == preferred)
        .or_else(|| variants.first())
        .cloned()
    else {
        bail!("Node {} not found", identifier);
    };

    let mut indexer = node_indexer(settings, backend, Arc::new(source));
    indexer
        .index_node(&node, workspace)
        .await
        .with_context(|| format!("Failed to index node {}", identifier))?;
    let report = indexer.flush().await.context("Failed to flush bulk request")?;
    info!(identifier = %identifier, submitted = report.submitted, "Indexed node");
    Ok(report)
}

/// Remove every variant of one node from the live alias and flush.
pub async fn remove_node(
    settings: &Settings,
    backend: Arc<dyn SearchBackend>,
    source: StaticNodeSource,
    identifier: &str,
) -> Result<FlushReport> {
    let variants = source.variants(identifier);
    if variants.is_empty() {
        bail!("Node {} not found", identifier);
    }

    let mut indexer = node_indexer(settings, backend, Arc::new(source));
    for node in &variants {
        indexer
            .remove_node(node)
            .with_context(|| format!("Failed to remove node {}", identifier))?;
    }
    let report = indexer.flush().await.context("Failed to flush bulk request")?;
    info!(identifier = %identifier, submitted = report.submitted, "Removed node");
    Ok(report)
}

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings.log_level)?;

    if let Commands::ShowMapping = cli.command {
        return show_mapping(&settings, &mut std::io::stdout().lock());
    }

    let backend: Arc<dyn SearchBackend> = Arc::new(
        HttpBackend::new(HttpBackendConfig::from_settings(&settings.backend))
            .context("Failed to create search backend client")?,
    );

    match cli.command {
        Commands::Build { limit } => {
            let source = load_nodes(cli.nodes.as_deref(), &settings)?;
            let mut config = RebuildConfig::default();
            if let Some(limit) = limit {
                config = config.with_limit(limit);
            }
            let result = build(&settings, backend, source, config).await?;
            println!("Published {} under {}", result.index_name, settings.index_name);
        }
        Commands::Cleanup => {
            for name in cleanup(&settings, backend).await? {
                println!("Removed {}", name);
            }
        }
        Commands::IndexNode {
            identifier,
            workspace,
        } => {
            let source = load_nodes(cli.nodes.as_deref(), &settings)?;
            index_node(&settings, backend, source, &identifier, workspace.as_deref()).await?;
        }
        Commands::RemoveNode { identifier } => {
            let source = load_nodes(cli.nodes.as_deref(), &settings)?;
            remove_node(&settings, backend, source, &identifier).await?;
        }
        Commands::ShowMapping => {}
    }
    Ok(())
}
