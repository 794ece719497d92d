//! Full index rebuild: create, map, populate, publish.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::buffer::FlushReport;
use crate::error::IndexingError;
use crate::indexer::NodeIndexer;
use crate::mapping::MappingBuilder;

/// Configuration for index rebuild operations.
#[derive(Debug, Clone)]
pub struct RebuildConfig {
    /// Maximum number of nodes passed to indexing.
    pub limit: Option<usize>,
    /// Nodes indexed between flushes.
    pub batch_size: usize,
    /// Index name postfix; defaults to the current Unix timestamp.
    pub postfix: Option<String>,
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self {
            limit: None,
            batch_size: 100,
            postfix: None,
        }
    }
}

impl RebuildConfig {
    /// Index at most `limit` nodes.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Use a fixed index name postfix.
    pub fn with_postfix(mut self, postfix: impl Into<String>) -> Self {
        self.postfix = Some(postfix.into());
        self
    }
}

/// Step reached by a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildState {
    Created,
    MappingApplied,
    Populated,
    Published,
}

impl fmt::Display for RebuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RebuildState::Created => "created",
            RebuildState::MappingApplied => "mapping-applied",
            RebuildState::Populated => "populated",
            RebuildState::Published => "published",
        };
        f.write_str(name)
    }
}

/// Progress tracking for rebuild operations.
#[derive(Debug, Clone, Default)]
pub struct RebuildProgress {
    /// Nodes passed to indexing.
    pub total_processed: u64,
    /// Of those, nodes flagged as removed.
    pub removed: u64,
    /// Bulk operations submitted.
    pub operations_submitted: u64,
    /// Bulk items the backend rejected.
    pub failed_items: u64,
    /// Whether the rebuild completed successfully.
    pub completed: bool,
}

impl RebuildProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_node(&mut self, removed: bool) {
        self.total_processed += 1;
        if removed {
            self.removed += 1;
        }
    }

    pub fn record_flush(&mut self, report: &FlushReport) {
        self.operations_submitted += report.submitted as u64;
        self.failed_items += report.failed_items.len() as u64;
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
    }
}

/// Result of a rebuild operation.
#[derive(Debug)]
pub struct RebuildResult {
    /// Physical index that was built.
    pub index_name: String,
    pub state: RebuildState,
    pub progress: RebuildProgress,
    /// Mapping problems reported by the builder.
    pub mapping_errors: Vec<String>,
    pub mapping_warnings: Vec<String>,
    /// Time taken in milliseconds.
    pub elapsed_ms: u64,
}

/// Trait for receiving rebuild progress updates.
pub trait ProgressCallback: Send + Sync {
    /// Called after every node passed to indexing.
    fn on_progress(&self, progress: &RebuildProgress);
}

/// A no-op progress callback for when progress reporting isn't needed.
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_progress(&self, _progress: &RebuildProgress) {}
}

/// A callback that logs progress at info level.
pub struct LoggingProgressCallback {
    interval: u64,
}

impl LoggingProgressCallback {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1) as u64,
        }
    }
}

impl ProgressCallback for LoggingProgressCallback {
    fn on_progress(&self, progress: &RebuildProgress) {
        if progress.total_processed % self.interval == 0 {
            info!(
                total = progress.total_processed,
                removed = progress.removed,
                submitted = progress.operations_submitted,
                failed = progress.failed_items,
                "Rebuild progress"
            );
        }
    }
}

/// Build a fresh physical index and publish it under the alias.
///
/// The previously published index keeps serving until the final alias
/// switch; a failure at any earlier step leaves the alias untouched.
pub async fn rebuild_index(
    indexer: &mut NodeIndexer,
    mappings: &dyn MappingBuilder,
    config: &RebuildConfig,
    progress_callback: Arc<dyn ProgressCallback>,
) -> Result<RebuildResult, IndexingError> {
    let start = Instant::now();
    let postfix = config
        .postfix
        .clone()
        .unwrap_or_else(|| chrono::Utc::now().timestamp().to_string());
    indexer.set_index_name_postfix(postfix);
    let handle = indexer.index_handle();
    let backend = indexer.backend().clone();

    backend.create_index(&handle.name).await?;
    info!(index = %handle.name, state = %RebuildState::Created, "Created index");

    let collection = mappings.build(&handle);
    for message in &collection.errors {
        error!(index = %handle.name, "Mapping error: {}", message);
    }
    for message in &collection.warnings {
        warn!(index = %handle.name, "Mapping warning: {}", message);
    }
    for mapping in &collection.mappings {
        mappings.apply(backend.as_ref(), &handle, mapping).await?;
    }
    info!(
        index = %handle.name,
        types = collection.mappings.len(),
        state = %RebuildState::MappingApplied,
        "Updated mapping"
    );

    let mut nodes = indexer.source().all_nodes()?;
    if let Some(limit) = config.limit {
        nodes.truncate(limit);
        info!(limit, "Indexing the first nodes only");
    }
    info!(count = nodes.len(), "Indexing nodes");

    let batch_size = config.batch_size.max(1);
    let callback = progress_callback.clone();
    let mut progress = indexer
        .with_bulk_processing(move |indexer| {
            Box::pin(async move {
                let mut progress = RebuildProgress::new();
                for (position, node) in nodes.iter().enumerate() {
                    indexer.index_node(node, None).await?;
                    debug!(workspace = %node.workspace, path = %node.path, "Indexed node");
                    progress.record_node(node.removed);
                    if (position + 1) % batch_size == 0 {
                        let report = indexer.flush().await?;
                        progress.record_flush(&report);
                    }
                    callback.on_progress(&progress);
                }
                Ok(progress)
            })
        })
        .await?;

    let report = indexer.flush().await?;
    progress.record_flush(&report);
    backend.refresh(&handle.name).await?;
    info!(index = %handle.name, state = %RebuildState::Populated, "Done indexing");

    indexer.update_index_alias().await?;
    progress.mark_completed();
    progress_callback.on_progress(&progress);
    info!(
        index = %handle.name,
        alias = %handle.alias,
        state = %RebuildState::Published,
        "Published index"
    );

    Ok(RebuildResult {
        index_name: handle.name,
        state: RebuildState::Published,
        progress,
        mapping_errors: collection.errors,
        mapping_warnings: collection.warnings,
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ConfiguredExtractor;
    use crate::mapping::ConfiguredMappingBuilder;
    use crate::source::{StaticDimensions, StaticNodeSource};
    use crsearch_client::{InMemoryBackend, SearchBackend};
    use crsearch_types::{document_id, ContentNode, NodeType, Settings};
    use std::sync::Mutex;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.index_name = "site".to_string();
        settings
            .node_types
            .insert("Acme:Page".to_string(), Default::default());
        settings
    }

    fn pages(count: usize) -> Vec<ContentNode> {
        (0..count)
            .map(|i| ContentNode::new(format!("p{}", i), format!("/p{}", i), "live", NodeType::new("Acme:Page")))
            .collect()
    }

    fn indexer(backend: Arc<InMemoryBackend>, nodes: Vec<ContentNode>) -> NodeIndexer {
        let settings = settings();
        NodeIndexer::new(
            backend,
            Arc::new(StaticNodeSource::new(nodes)),
            Arc::new(StaticDimensions::default()),
            Arc::new(ConfiguredExtractor::from_settings(&settings)),
            &settings,
        )
    }

    /// Records every progress snapshot.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<u64>>);

    impl ProgressCallback for Recorder {
        fn on_progress(&self, progress: &RebuildProgress) {
            self.0.lock().unwrap().push(progress.total_processed);
        }
    }

    #[tokio::test]
    async fn test_rebuild_publishes_new_index() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut indexer = indexer(backend.clone(), pages(5));
        let builder = ConfiguredMappingBuilder::from_settings(&settings());
        let recorder = Arc::new(Recorder::default());

        let result = rebuild_index(
            &mut indexer,
            &builder,
            &RebuildConfig::default().with_postfix("100").with_batch_size(2),
            recorder.clone(),
        )
        .await
        .unwrap();

        assert_eq!(result.index_name, "site-100");
        assert_eq!(result.state, RebuildState::Published);
        assert!(result.progress.completed);
        assert_eq!(result.progress.total_processed, 5);
        assert_eq!(result.progress.operations_submitted, 5);
        assert_eq!(backend.document_count("site").await, 5);
        assert_eq!(backend.refresh_count("site-100").await, 1);
        assert!(backend.mapping("site-100", "Acme-Page").await.is_some());
        assert_eq!(backend.aliased_indices("site").await.unwrap(), vec!["site-100"]);
        // Three flushes for five nodes in batches of two.
        assert_eq!(backend.bulk_request_count().await, 3);
        assert_eq!(*recorder.0.lock().unwrap(), vec![1, 2, 3, 4, 5, 5]);
        assert!(!indexer.is_bulk_processing());
    }

    #[tokio::test]
    async fn test_limit_is_exact() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut indexer = indexer(backend.clone(), pages(150));
        let builder = ConfiguredMappingBuilder::from_settings(&settings());

        let result = rebuild_index(
            &mut indexer,
            &builder,
            &RebuildConfig::default().with_postfix("100").with_limit(100),
            Arc::new(NoOpProgressCallback),
        )
        .await
        .unwrap();

        assert_eq!(result.progress.total_processed, 100);
        assert_eq!(backend.document_count("site").await, 100);
        assert!(backend
            .document("site", "Acme-Page", &document_id("/p99@live"))
            .await
            .is_some());
        assert!(backend
            .document("site", "Acme-Page", &document_id("/p100@live"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_alias() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut indexer = indexer(backend.clone(), pages(3));
        let builder = ConfiguredMappingBuilder::from_settings(&settings());

        rebuild_index(
            &mut indexer,
            &builder,
            &RebuildConfig::default().with_postfix("100"),
            Arc::new(NoOpProgressCallback),
        )
        .await
        .unwrap();

        // Same postfix again: index creation fails before anything else.
        let err = rebuild_index(
            &mut indexer,
            &builder,
            &RebuildConfig::default().with_postfix("100"),
            Arc::new(NoOpProgressCallback),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IndexingError::Backend(_)));
        assert_eq!(backend.aliased_indices("site").await.unwrap(), vec!["site-100"]);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(RebuildState::MappingApplied.to_string(), "mapping-applied");
        assert_eq!(RebuildState::Published.to_string(), "published");
    }
}
