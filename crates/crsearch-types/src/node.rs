//! Content node model.
//!
//! Nodes are supplied by an external node source and never mutated here.
//! A node lives in exactly one workspace and one dimension combination;
//! the same logical node (same identifier) appears once per such view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node type name used for untyped placeholder nodes. These are never indexed.
pub const UNSTRUCTURED_NODE_TYPE: &str = "unstructured";

/// Name of the canonical live workspace.
pub const LIVE_WORKSPACE: &str = "live";

/// Dimension name -> ordered list of values (e.g. `language -> [de_CH, de]`).
///
/// A `BTreeMap` keeps the encoding canonical, so context paths and
/// dimension hashes are stable across runs.
pub type DimensionCombination = BTreeMap<String, Vec<String>>;

fn default_true() -> bool {
    true
}

/// Search-related settings attached to a node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulltextSettings {
    /// Whether nodes of this type contribute fulltext.
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Whether nodes of this type own the aggregated fulltext of their subtree.
    #[serde(default)]
    pub is_root: bool,
}

impl Default for FulltextSettings {
    fn default() -> Self {
        Self {
            enable: true,
            is_root: false,
        }
    }
}

/// Node type of a content node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeType {
    /// Fully qualified node type name (e.g. `Acme.Site:Page`)
    pub name: String,

    #[serde(default)]
    pub fulltext: FulltextSettings,
}

impl NodeType {
    /// Create a node type with default search settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fulltext: FulltextSettings::default(),
        }
    }

    /// Mark this node type as a fulltext root.
    pub fn fulltext_root(mut self) -> Self {
        self.fulltext.is_root = true;
        self
    }

    /// Disable fulltext contributions for this node type.
    pub fn without_fulltext(mut self) -> Self {
        self.fulltext.enable = false;
        self
    }

    pub fn is_unstructured(&self) -> bool {
        self.name == UNSTRUCTURED_NODE_TYPE
    }

    pub fn is_fulltext_root(&self) -> bool {
        self.fulltext.is_root
    }

    pub fn is_fulltext_enabled(&self) -> bool {
        self.fulltext.enable
    }

    /// Backend type name for this node type.
    pub fn mapping_name(&self) -> String {
        mapping_name_for(&self.name)
    }
}

/// Convert a node type name into the type name used by the search backend.
///
/// `Acme.Site:Page` becomes `Acme-Site-Page`.
pub fn mapping_name_for(node_type_name: &str) -> String {
    node_type_name.replace(['.', ':'], "-")
}

/// A content node in one workspace and dimension combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    /// Identifier, stable across workspaces and dimensions
    pub identifier: String,

    /// Hierarchical path (e.g. `/sites/acme/about`)
    pub path: String,

    /// Workspace the node was loaded from
    pub workspace: String,

    #[serde(default)]
    pub dimensions: DimensionCombination,

    /// Whether the node is flagged as removed
    #[serde(default)]
    pub removed: bool,

    pub node_type: NodeType,

    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl ContentNode {
    /// Create a node without dimensions or properties.
    pub fn new(
        identifier: impl Into<String>,
        path: impl Into<String>,
        workspace: impl Into<String>,
        node_type: NodeType,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            path: path.into(),
            workspace: workspace.into(),
            dimensions: DimensionCombination::new(),
            removed: false,
            node_type,
            properties: Map::new(),
        }
    }

    pub fn with_dimensions(mut self, dimensions: DimensionCombination) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Flag this node as removed.
    pub fn removed(mut self) -> Self {
        self.removed = true;
        self
    }

    /// Fully qualified context path in the node's own workspace.
    pub fn context_path(&self) -> String {
        context_path(&self.path, &self.workspace, &self.dimensions)
    }

    /// Context path with the workspace replaced by `workspace`.
    pub fn context_path_in(&self, workspace: &str) -> String {
        context_path(&self.path, workspace, &self.dimensions)
    }

    /// Path of the parent node, `None` for the hierarchy root.
    pub fn parent_path(&self) -> Option<String> {
        parent_path(&self.path)
    }

    /// Number of path segments (`/` is 0, `/sites` is 1).
    pub fn depth(&self) -> usize {
        self.path.split('/').filter(|s| !s.is_empty()).count()
    }
}

/// Build a context path: `path@workspace[;dim=v1,v2&dim2=v3]`.
pub fn context_path(path: &str, workspace: &str, dimensions: &DimensionCombination) -> String {
    let mut context_path = format!("{}@{}", path, workspace);
    if !dimensions.is_empty() {
        let encoded: Vec<String> = dimensions
            .iter()
            .map(|(name, values)| format!("{}={}", name, values.join(",")))
            .collect();
        context_path.push(';');
        context_path.push_str(&encoded.join("&"));
    }
    context_path
}

/// Parent of a hierarchical path.
pub fn parent_path(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(pos) => Some(trimmed[..pos].to_string()),
        None => None,
    }
}
