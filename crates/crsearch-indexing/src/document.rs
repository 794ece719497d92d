//! Per-node document decision.
//!
//! [`decide`] takes everything it needs explicitly and performs no I/O;
//! the caller queues whatever it returns.

use serde_json::Value;

use crsearch_types::document::{
    DIMENSION_COMBINATIONS_FIELD, DIMENSION_COMBINATION_HASH_FIELD, IDENTIFIER_FIELD, PATH_FIELD,
    WORKSPACE_FIELD,
};
use crsearch_types::{
    dimension_hash, document_id, ContentNode, FulltextBuckets, SearchDocument, Settings,
    LIVE_WORKSPACE,
};

use crate::error::IndexingError;
use crate::extract::PropertyExtractor;

/// Workspace filtering knobs.
#[derive(Debug, Clone)]
pub struct WorkspacePolicy {
    pub index_all_workspaces: bool,
    pub live_workspace: String,
}

impl Default for WorkspacePolicy {
    fn default() -> Self {
        Self {
            index_all_workspaces: false,
            live_workspace: LIVE_WORKSPACE.to_string(),
        }
    }
}

impl WorkspacePolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            index_all_workspaces: settings.index_all_workspaces,
            live_workspace: settings.live_workspace.clone(),
        }
    }

    /// Whether content seen through `target_workspace` (or the node's own
    /// workspace when no target is given) may be indexed.
    pub fn admits(&self, node: &ContentNode, target_workspace: Option<&str>) -> bool {
        if self.index_all_workspaces {
            return true;
        }
        match target_workspace {
            Some(target) => target == self.live_workspace,
            None => node.workspace == self.live_workspace,
        }
    }
}

/// Why a node produced no document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Unstructured,
    WorkspaceExcluded,
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, PartialEq)]
pub enum IndexDecision {
    Skipped(SkipReason),
    Delete { id: String, type_name: String },
    Upsert {
        document: SearchDocument,
        fulltext: FulltextBuckets,
    },
}

impl IndexDecision {
    /// Document id for non-skipped decisions.
    pub fn document_id(&self) -> Option<&str> {
        match self {
            IndexDecision::Skipped(_) => None,
            IndexDecision::Delete { id, .. } => Some(id),
            IndexDecision::Upsert { document, .. } => Some(&document.id),
        }
    }
}

/// Workspace a document is written for.
pub fn effective_workspace<'a>(node: &'a ContentNode, target_workspace: Option<&'a str>) -> &'a str {
    target_workspace.unwrap_or(&node.workspace)
}

/// Decide what indexing `node` means.
///
/// `on_skipped` receives every property name the extractor had no
/// configuration for.
pub fn decide(
    node: &ContentNode,
    target_workspace: Option<&str>,
    policy: &WorkspacePolicy,
    extractor: &dyn PropertyExtractor,
    on_skipped: &mut dyn FnMut(&str),
) -> Result<IndexDecision, IndexingError> {
    if node.node_type.is_unstructured() {
        return Ok(IndexDecision::Skipped(SkipReason::Unstructured));
    }
    if !policy.admits(node, target_workspace) {
        return Ok(IndexDecision::Skipped(SkipReason::WorkspaceExcluded));
    }

    let workspace = effective_workspace(node, target_workspace);
    let id = document_id(&node.context_path_in(workspace));
    let type_name = node.node_type.mapping_name();

    if node.removed {
        return Ok(IndexDecision::Delete { id, type_name });
    }

    let extraction = extractor.extract(node, on_skipped);
    let mut fields = extraction.fields;
    fields.insert(IDENTIFIER_FIELD.to_string(), Value::String(node.identifier.clone()));
    fields.insert(PATH_FIELD.to_string(), Value::String(node.path.clone()));
    fields.insert(WORKSPACE_FIELD.to_string(), Value::String(workspace.to_string()));
    fields.insert(
        DIMENSION_COMBINATIONS_FIELD.to_string(),
        serde_json::to_value(&node.dimensions)?,
    );
    fields.insert(
        DIMENSION_COMBINATION_HASH_FIELD.to_string(),
        Value::String(dimension_hash(&node.dimensions)?),
    );

    Ok(IndexDecision::Upsert {
        document: SearchDocument::new(id, type_name, fields),
        fulltext: extraction.fulltext,
    })
}
