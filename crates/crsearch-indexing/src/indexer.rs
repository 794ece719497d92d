//! The node indexer: per-change entry point of the pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crsearch_client::SearchBackend;
use crsearch_types::{
    document_id, BulkOperation, ContentNode, DimensionCombination, IndexHandle, Settings,
    UpdateScript,
};

use crate::buffer::{BulkWriteBuffer, FlushReport};
use crate::document::{decide, IndexDecision, WorkspacePolicy};
use crate::error::IndexingError;
use crate::extract::PropertyExtractor;
use crate::fulltext::FulltextAggregator;
use crate::lifecycle::IndexLifecycleManager;
use crate::reconcile::DuplicateReconciler;
use crate::source::{DimensionProvider, NodeSource};

/// Turns content changes into queued bulk operations.
pub struct NodeIndexer {
    backend: Arc<dyn SearchBackend>,
    source: Arc<dyn NodeSource>,
    dimensions: Arc<dyn DimensionProvider>,
    extractor: Arc<dyn PropertyExtractor>,
    policy: WorkspacePolicy,
    aggregator: FulltextAggregator,
    reconciler: DuplicateReconciler,
    lifecycle: IndexLifecycleManager,
    retry_on_conflict: u32,
    alias: String,
    postfix: Option<String>,
    buffer: BulkWriteBuffer,
    bulk_processing: Arc<AtomicBool>,
}

/// Restores the bulk-processing mode on drop, so a cancelled run resets it too.
struct BulkModeGuard {
    flag: Arc<AtomicBool>,
    previous: bool,
}

impl Drop for BulkModeGuard {
    fn drop(&mut self) {
        self.flag.store(self.previous, Ordering::SeqCst);
    }
}

impl NodeIndexer {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        source: Arc<dyn NodeSource>,
        dimensions: Arc<dyn DimensionProvider>,
        extractor: Arc<dyn PropertyExtractor>,
        settings: &Settings,
    ) -> Self {
        Self {
            lifecycle: IndexLifecycleManager::new(backend.clone()),
            backend,
            source,
            dimensions,
            extractor,
            policy: WorkspacePolicy::from_settings(settings),
            aggregator: FulltextAggregator::from_settings(settings),
            reconciler: DuplicateReconciler::from_settings(settings),
            retry_on_conflict: settings.indexing.retry_on_conflict,
            alias: settings.index_name.clone(),
            postfix: None,
            buffer: BulkWriteBuffer::new(),
            bulk_processing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    pub fn source(&self) -> &Arc<dyn NodeSource> {
        &self.source
    }

    /// `alias`, or `alias-postfix` once a postfix is set.
    pub fn index_name(&self) -> String {
        self.index_handle().name
    }

    pub fn index_handle(&self) -> IndexHandle {
        IndexHandle::new(self.alias.clone(), self.postfix.as_deref())
    }

    pub fn set_index_name_postfix(&mut self, postfix: impl Into<String>) {
        self.postfix = Some(postfix.into());
    }

    pub fn is_bulk_processing(&self) -> bool {
        self.bulk_processing.load(Ordering::SeqCst)
    }

    /// Operations waiting for the next flush.
    pub fn pending(&self) -> &[BulkOperation] {
        self.buffer.operations()
    }

    /// Index a node in every allowed dimension combination.
    ///
    /// `target_workspace` is set when the change is being published into
    /// that workspace.
    pub async fn index_node(
        &mut self,
        node: &ContentNode,
        target_workspace: Option<&str>,
    ) -> Result<(), IndexingError> {
        if node.removed {
            self.index_variant(node, target_workspace).await?;
        }

        let workspace = target_workspace
            .unwrap_or(&self.policy.live_workspace)
            .to_string();
        let mut combinations = self.dimensions.allowed_combinations();
        if combinations.is_empty() {
            combinations.push(DimensionCombination::new());
        }

        for combination in &combinations {
            let variant = self
                .source
                .node_by_identifier(&node.identifier, &workspace, combination)?;
            if let Some(variant) = variant {
                self.index_variant(&variant, target_workspace).await?;
            }
        }
        Ok(())
    }

    /// Single-node indexing path: decide, reconcile, queue.
    async fn index_variant(
        &mut self,
        node: &ContentNode,
        target_workspace: Option<&str>,
    ) -> Result<(), IndexingError> {
        let context_path = node.context_path();
        let decision = decide(
            node,
            target_workspace,
            &self.policy,
            self.extractor.as_ref(),
            &mut |property| {
                debug!(
                    context_path = %context_path,
                    property = %property,
                    "Property not indexed because no configuration found"
                );
            },
        )?;

        let index = self.index_name();
        let type_name = node.node_type.mapping_name();
        if let Some(id) = decision.document_id() {
            if !self.is_bulk_processing() {
                self.reconciler
                    .reconcile(self.backend.as_ref(), &index, id, &type_name)
                    .await?;
            }
        }

        match decision {
            IndexDecision::Skipped(reason) => {
                debug!(context_path = %context_path, reason = ?reason, "Skipped node");
            }
            IndexDecision::Delete { id, type_name } => {
                self.buffer
                    .enqueue(BulkOperation::delete(index.clone(), type_name, id.clone()));
                let purge = self.aggregator.purge_update(
                    node,
                    target_workspace,
                    self.source.as_ref(),
                    &index,
                )?;
                self.queue(purge);
                debug!(context_path = %context_path, doc_id = %id, "Removed node (flagged as removed)");
            }
            IndexDecision::Upsert { document, fulltext } => {
                let id = document.id.clone();
                let operation = if node.node_type.is_fulltext_root() {
                    BulkOperation::Update {
                        index: index.clone(),
                        type_name: document.type_name,
                        id: document.id,
                        script: UpdateScript::ReplacePreservingFulltext {
                            data: document.fields,
                        },
                        retry_on_conflict: self.retry_on_conflict,
                    }
                } else {
                    BulkOperation::index(index.clone(), &document)
                };
                self.buffer.enqueue(operation);

                if node.node_type.is_fulltext_enabled() {
                    let merge = self.aggregator.contribution_update(
                        node,
                        &fulltext,
                        target_workspace,
                        self.source.as_ref(),
                        &index,
                    )?;
                    self.queue(merge);
                }
                debug!(context_path = %context_path, doc_id = %id, "Added / updated node");
            }
        }
        Ok(())
    }

    fn queue(&mut self, operation: Option<BulkOperation>) {
        if let Some(operation) = operation {
            self.buffer.enqueue(operation);
        }
    }

    /// Queue deletion of a node that no longer exists, purging its fulltext.
    pub fn remove_node(&mut self, node: &ContentNode) -> Result<(), IndexingError> {
        if !self.policy.index_all_workspaces && node.workspace != self.policy.live_workspace {
            debug!(context_path = %node.context_path(), "Not removing node outside the live workspace");
            return Ok(());
        }

        let index = self.index_name();
        let id = document_id(&node.context_path());
        self.buffer.enqueue(BulkOperation::delete(
            index.clone(),
            node.node_type.mapping_name(),
            id.clone(),
        ));
        let purge = self
            .aggregator
            .purge_update(node, None, self.source.as_ref(), &index)?;
        self.queue(purge);

        debug!(context_path = %node.context_path(), doc_id = %id, "Removed node (node actually removed)");
        Ok(())
    }

    /// Submit everything queued as one bulk request.
    pub async fn flush(&mut self) -> Result<FlushReport, IndexingError> {
        let index = self.index_name();
        self.buffer.flush(self.backend.as_ref(), &index).await
    }

    /// Run `f` with duplicate reconciliation disabled, restoring the
    /// previous mode afterwards whether `f` succeeds, fails or is dropped.
    pub async fn with_bulk_processing<T, F>(&mut self, f: F) -> Result<T, IndexingError>
    where
        F: for<'a> FnOnce(&'a mut NodeIndexer) -> BoxFuture<'a, Result<T, IndexingError>>,
    {
        let _guard = BulkModeGuard {
            previous: self.bulk_processing.swap(true, Ordering::SeqCst),
            flag: self.bulk_processing.clone(),
        };
        f(self).await
    }

    /// Publish the current index under the alias.
    pub async fn update_index_alias(&self) -> Result<(), IndexingError> {
        self.lifecycle.update_index_alias(&self.index_handle()).await
    }

    /// Delete indices of this alias that are no longer live.
    pub async fn remove_old_indices(&self) -> Result<Vec<String>, IndexingError> {
        self.lifecycle.remove_old_indices(&self.index_handle()).await
    }
}
