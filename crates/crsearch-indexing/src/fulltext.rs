//! Fulltext aggregation onto the nearest fulltext root.

use tracing::{debug, warn};

use crsearch_types::{document_id, BulkOperation, ContentNode, FulltextBuckets, Settings, UpdateScript};

use crate::error::IndexingError;
use crate::source::NodeSource;

/// Upper bound on parent hops while looking for a fulltext root.
pub const MAX_ANCESTOR_DEPTH: usize = 128;

/// Builds the scripted updates that merge a node's fulltext into its root.
#[derive(Debug, Clone)]
pub struct FulltextAggregator {
    live_workspace: String,
    retry_on_conflict: u32,
}

impl FulltextAggregator {
    pub fn new(live_workspace: impl Into<String>, retry_on_conflict: u32) -> Self {
        Self {
            live_workspace: live_workspace.into(),
            retry_on_conflict,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.live_workspace.clone(),
            settings.indexing.retry_on_conflict,
        )
    }

    /// Closest node (the node itself included) flagged as fulltext root.
    pub fn find_root(
        &self,
        node: &ContentNode,
        source: &dyn NodeSource,
    ) -> Result<Option<ContentNode>, IndexingError> {
        let mut current = node.clone();
        for _ in 0..=MAX_ANCESTOR_DEPTH {
            if current.node_type.is_fulltext_root() {
                return Ok(Some(current));
            }
            match source.parent(&current)? {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
        warn!(path = %node.path, "Gave up looking for a fulltext root, hierarchy too deep");
        Ok(None)
    }

    /// Fulltext aggregation only targets the live view: the publish target
    /// when one is given, otherwise the node's own workspace.
    fn targets_live(&self, node: &ContentNode, target_workspace: Option<&str>) -> bool {
        match target_workspace {
            Some(target) => target == self.live_workspace,
            None => node.workspace == self.live_workspace,
        }
    }

    /// Update merging `contribution` into the root aggregate.
    ///
    /// `None` when the node is outside the live view or has no fulltext root.
    pub fn contribution_update(
        &self,
        node: &ContentNode,
        contribution: &FulltextBuckets,
        target_workspace: Option<&str>,
        source: &dyn NodeSource,
        index: &str,
    ) -> Result<Option<BulkOperation>, IndexingError> {
        self.update(node, contribution, target_workspace, false, source, index)
    }

    /// Update removing the node's part from the root aggregate.
    pub fn purge_update(
        &self,
        node: &ContentNode,
        target_workspace: Option<&str>,
        source: &dyn NodeSource,
        index: &str,
    ) -> Result<Option<BulkOperation>, IndexingError> {
        self.update(node, &FulltextBuckets::new(), target_workspace, true, source, index)
    }

    fn update(
        &self,
        node: &ContentNode,
        contribution: &FulltextBuckets,
        target_workspace: Option<&str>,
        removal: bool,
        source: &dyn NodeSource,
        index: &str,
    ) -> Result<Option<BulkOperation>, IndexingError> {
        if !self.targets_live(node, target_workspace) {
            return Ok(None);
        }

        let Some(root) = self.find_root(node, source)? else {
            warn!(path = %node.path, "No fulltext root found");
            return Ok(None);
        };

        // A removed root goes away with its aggregate; an upsert would recreate it.
        if removal && root.identifier == node.identifier {
            debug!(node = %node.identifier, "Removed node is its own fulltext root, nothing to purge");
            return Ok(None);
        }

        let root_id = document_id(&root.context_path_in(&self.live_workspace));
        debug!(
            node = %node.identifier,
            root = %root.path,
            doc_id = %root_id,
            purge = contribution.is_empty(),
            "Queueing fulltext merge"
        );

        Ok(Some(BulkOperation::Update {
            index: index.to_string(),
            type_name: root.node_type.mapping_name(),
            id: root_id,
            script: UpdateScript::MergeFulltext {
                identifier: node.identifier.clone(),
                fulltext: contribution.clone(),
            },
            retry_on_conflict: self.retry_on_conflict,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticNodeSource;
    use crsearch_types::NodeType;

    fn source(workspace: &str) -> StaticNodeSource {
        StaticNodeSource::new(vec![
            ContentNode::new("site", "/sites/a", workspace, NodeType::new("Acme:Home").fulltext_root()),
            ContentNode::new("main", "/sites/a/main", workspace, NodeType::new("Acme:Section")),
            ContentNode::new("text", "/sites/a/main/text", workspace, NodeType::new("Acme:Text")),
            ContentNode::new("orphan", "/other/text", workspace, NodeType::new("Acme:Text")),
        ])
    }

    fn buckets(text: &str) -> FulltextBuckets {
        let mut buckets = FulltextBuckets::new();
        buckets.insert("text".to_string(), text.to_string());
        buckets
    }

    fn node(source: &StaticNodeSource, id: &str, workspace: &str) -> ContentNode {
        source
            .node_by_identifier(id, workspace, &Default::default())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_merge_targets_nearest_root_in_live() {
        let source = source("live");
        let aggregator = FulltextAggregator::new("live", 3);
        let text = node(&source, "text", "live");

        let op = aggregator
            .contribution_update(&text, &buckets("Hello"), None, &source, "idx")
            .unwrap()
            .unwrap();

        match op {
            BulkOperation::Update {
                id,
                type_name,
                script,
                retry_on_conflict,
                ..
            } => {
                assert_eq!(id, document_id("/sites/a@live"));
                assert_eq!(type_name, "Acme-Home");
                assert_eq!(retry_on_conflict, 3);
                assert_eq!(
                    script,
                    UpdateScript::MergeFulltext {
                        identifier: "text".to_string(),
                        fulltext: buckets("Hello"),
                    }
                );
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_root_contributes_to_itself() {
        let source = source("live");
        let aggregator = FulltextAggregator::new("live", 3);
        let site = node(&source, "site", "live");
        let root = aggregator.find_root(&site, &source).unwrap().unwrap();
        assert_eq!(root.identifier, "site");
    }

    #[test]
    fn test_missing_root_is_not_an_error() {
        let source = source("live");
        let aggregator = FulltextAggregator::new("live", 3);
        let orphan = node(&source, "orphan", "live");
        assert!(aggregator
            .contribution_update(&orphan, &buckets("x"), None, &source, "idx")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_non_live_views_are_ignored() {
        let source = source("user-bob");
        let aggregator = FulltextAggregator::new("live", 3);
        let text = node(&source, "text", "user-bob");

        assert!(aggregator
            .contribution_update(&text, &buckets("x"), None, &source, "idx")
            .unwrap()
            .is_none());
        assert!(aggregator
            .contribution_update(&text, &buckets("x"), Some("user-bob"), &source, "idx")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_purge_only_from_live_view() {
        let source = source("user-bob");
        let aggregator = FulltextAggregator::new("live", 3);
        let text = node(&source, "text", "user-bob");

        // Discarding a draft leaves the live aggregate alone.
        assert!(aggregator.purge_update(&text, None, &source, "idx").unwrap().is_none());
        assert!(aggregator
            .purge_update(&text, Some("user-bob"), &source, "idx")
            .unwrap()
            .is_none());

        // Publishing the removal into live purges the live root.
        let op = aggregator
            .purge_update(&text, Some("live"), &source, "idx")
            .unwrap()
            .unwrap();
        assert_eq!(op.id(), document_id("/sites/a@live"));
        match op {
            BulkOperation::Update { script, .. } => assert_eq!(
                script,
                UpdateScript::MergeFulltext {
                    identifier: "text".to_string(),
                    fulltext: FulltextBuckets::new(),
                }
            ),
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_removed_root_is_not_purged_into_itself() {
        let source = source("live");
        let aggregator = FulltextAggregator::new("live", 3);
        let site = node(&source, "site", "live");

        assert!(aggregator.purge_update(&site, None, &source, "idx").unwrap().is_none());
        assert!(aggregator
            .contribution_update(&site, &buckets("Welcome"), None, &source, "idx")
            .unwrap()
            .is_some());
    }
}
