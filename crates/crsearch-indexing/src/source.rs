//! Collaborators that supply content: the node source and the
//! dimension-combination provider.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crsearch_types::{ContentNode, DimensionCombination, Settings, LIVE_WORKSPACE};

use crate::error::IndexingError;

/// Read access to the content repository.
pub trait NodeSource: Send + Sync {
    /// Every node known to the source, in enumeration order.
    fn all_nodes(&self) -> Result<Vec<ContentNode>, IndexingError>;

    /// The node with `identifier` as seen in one workspace and dimension view.
    fn node_by_identifier(
        &self,
        identifier: &str,
        workspace: &str,
        dimensions: &DimensionCombination,
    ) -> Result<Option<ContentNode>, IndexingError>;

    /// Parent of `node` in the same view; `None` at the hierarchy root.
    fn parent(&self, node: &ContentNode) -> Result<Option<ContentNode>, IndexingError>;
}

/// Allowed dimension combinations of the install.
pub trait DimensionProvider: Send + Sync {
    /// May be empty, meaning a single default combination.
    fn allowed_combinations(&self) -> Vec<DimensionCombination>;
}

/// Fixed list of dimension combinations.
#[derive(Debug, Clone, Default)]
pub struct StaticDimensions {
    combinations: Vec<DimensionCombination>,
}

impl StaticDimensions {
    pub fn new(combinations: Vec<DimensionCombination>) -> Self {
        Self { combinations }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.dimensions.clone())
    }
}

impl DimensionProvider for StaticDimensions {
    fn allowed_combinations(&self) -> Vec<DimensionCombination> {
        self.combinations.clone()
    }
}

/// One node as written in a JSON fixture file.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeRecord {
    pub identifier: String,
    pub path: String,
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default)]
    pub dimensions: DimensionCombination,
    #[serde(default)]
    pub removed: bool,
    pub node_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

fn default_workspace() -> String {
    LIVE_WORKSPACE.to_string()
}

impl NodeRecord {
    /// Resolve the record's node type through the schema registry.
    pub fn into_node(self, settings: &Settings) -> ContentNode {
        let mut node = ContentNode::new(
            self.identifier,
            self.path,
            self.workspace,
            settings.node_type(&self.node_type),
        )
        .with_dimensions(self.dimensions);
        node.properties = self.properties;
        node.removed = self.removed;
        node
    }
}

/// In-memory node set.
#[derive(Debug, Clone, Default)]
pub struct StaticNodeSource {
    nodes: Vec<ContentNode>,
}

impl StaticNodeSource {
    pub fn new(nodes: Vec<ContentNode>) -> Self {
        Self { nodes }
    }

    /// Parse a JSON array of node records.
    pub fn from_json(json: &str, settings: &Settings) -> Result<Self, IndexingError> {
        let records: Vec<NodeRecord> = serde_json::from_str(json)?;
        Ok(Self::new(
            records
                .into_iter()
                .map(|record| record.into_node(settings))
                .collect(),
        ))
    }

    /// Load a JSON fixture file.
    pub fn load(path: &Path, settings: &Settings) -> Result<Self, IndexingError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            IndexingError::Source(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json, settings)
    }

    pub fn push(&mut self, node: ContentNode) {
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every variant (workspace, dimensions) of a node.
    pub fn variants(&self, identifier: &str) -> Vec<ContentNode> {
        self.nodes
            .iter()
            .filter(|node| node.identifier == identifier)
            .cloned()
            .collect()
    }
}

impl NodeSource for StaticNodeSource {
    fn all_nodes(&self) -> Result<Vec<ContentNode>, IndexingError> {
        Ok(self.nodes.clone())
    }

    fn node_by_identifier(
        &self,
        identifier: &str,
        workspace: &str,
        dimensions: &DimensionCombination,
    ) -> Result<Option<ContentNode>, IndexingError> {
        Ok(self
            .nodes
            .iter()
            .find(|node| {
                node.identifier == identifier
                    && node.workspace == workspace
                    && &node.dimensions == dimensions
            })
            .cloned())
    }

    fn parent(&self, node: &ContentNode) -> Result<Option<ContentNode>, IndexingError> {
        let Some(parent_path) = node.parent_path() else {
            return Ok(None);
        };
        Ok(self
            .nodes
            .iter()
            .find(|candidate| {
                candidate.path == parent_path
                    && candidate.workspace == node.workspace
                    && candidate.dimensions == node.dimensions
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crsearch_types::NodeType;
    use std::io::Write;

    fn dims(language: &str) -> DimensionCombination {
        let mut dims = DimensionCombination::new();
        dims.insert("language".to_string(), vec![language.to_string()]);
        dims
    }

    fn source() -> StaticNodeSource {
        let page = NodeType::new("Acme:Page");
        StaticNodeSource::new(vec![
            ContentNode::new("site", "/sites/a", "live", page.clone()).with_dimensions(dims("en")),
            ContentNode::new("p1", "/sites/a/page1", "live", page.clone()).with_dimensions(dims("en")),
            ContentNode::new("p1", "/sites/a/page1", "live", page.clone()).with_dimensions(dims("de")),
            ContentNode::new("p1", "/sites/a/page1", "user-bob", page).with_dimensions(dims("en")),
        ])
    }

    #[test]
    fn test_node_by_identifier_respects_view() {
        let source = source();
        let node = source
            .node_by_identifier("p1", "live", &dims("de"))
            .unwrap()
            .unwrap();
        assert_eq!(node.dimensions, dims("de"));
        assert!(source
            .node_by_identifier("p1", "live", &dims("fr"))
            .unwrap()
            .is_none());
        assert_eq!(source.variants("p1").len(), 3);
    }

    #[test]
    fn test_parent_stays_in_view() {
        let source = source();
        let child = source
            .node_by_identifier("p1", "live", &dims("en"))
            .unwrap()
            .unwrap();
        let parent = source.parent(&child).unwrap().unwrap();
        assert_eq!(parent.identifier, "site");

        // No German site node exists.
        let child = source
            .node_by_identifier("p1", "live", &dims("de"))
            .unwrap()
            .unwrap();
        assert!(source.parent(&child).unwrap().is_none());
    }

    #[test]
    fn test_load_fixture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"identifier": "home", "path": "/sites/a", "node_type": "Acme:Home",
                  "properties": {{"title": "Home"}}}},
                {{"identifier": "old", "path": "/sites/a/old", "workspace": "user-bob",
                  "node_type": "Acme:Page", "removed": true}}
            ]"#
        )
        .unwrap();

        let mut settings = Settings::default();
        settings
            .node_types
            .insert("Acme:Home".to_string(), Default::default());
        settings.node_types.get_mut("Acme:Home").unwrap().fulltext_root = true;

        let source = StaticNodeSource::load(file.path(), &settings).unwrap();
        let nodes = source.all_nodes().unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].node_type.is_fulltext_root());
        assert_eq!(nodes[0].workspace, "live");
        assert_eq!(nodes[0].properties["title"], "Home");
        assert!(nodes[1].removed);
    }

    #[test]
    fn test_load_missing_fixture() {
        let err = StaticNodeSource::load(Path::new("/nonexistent/nodes.json"), &Settings::default())
            .unwrap_err();
        assert!(matches!(err, IndexingError::Source(_)));
    }
}
