//! End-to-end test infrastructure for the content search indexer.
//!
//! Provides a shared TestHarness wiring a [`NodeIndexer`] to the simulated
//! backend, plus builders for a small site tree.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crsearch_client::InMemoryBackend;
use crsearch_indexing::{
    rebuild_index, ConfiguredExtractor, ConfiguredMappingBuilder, NoOpProgressCallback,
    NodeIndexer, RebuildConfig, RebuildResult, StaticDimensions, StaticNodeSource,
};
use crsearch_types::{
    document_id, ContentNode, DimensionCombination, NodeTypeSchema, PropertySchema, Settings,
};

/// Alias every harness index is published under.
pub const ALIAS: &str = "site";

/// Settings with a small node type registry:
/// `Acme:Home` (fulltext root), `Acme:Page`, `Acme:Text`.
pub fn site_settings() -> Settings {
    let mut settings = Settings::default();
    settings.index_name = ALIAS.to_string();

    let title = PropertySchema {
        mapping: Some(json!({ "type": "text" })),
        fulltext_bucket: Some("h1".to_string()),
        ..Default::default()
    };
    let body = PropertySchema {
        mapping: Some(json!({ "type": "text" })),
        fulltext_bucket: Some("text".to_string()),
        ..Default::default()
    };

    let mut home = NodeTypeSchema {
        fulltext_root: true,
        ..Default::default()
    };
    home.properties.insert("title".to_string(), title.clone());

    let mut page = NodeTypeSchema::default();
    page.properties.insert("title".to_string(), title.clone());
    page.properties.insert("body".to_string(), body.clone());

    let mut text = NodeTypeSchema::default();
    text.properties.insert("title".to_string(), title);
    text.properties.insert("body".to_string(), body);

    settings.node_types.insert("Acme:Home".to_string(), home);
    settings.node_types.insert("Acme:Page".to_string(), page);
    settings.node_types.insert("Acme:Text".to_string(), text);
    settings
}

/// Shared test harness for E2E tests.
pub struct TestHarness {
    pub backend: Arc<InMemoryBackend>,
    pub settings: Settings,
    pub nodes: Vec<ContentNode>,
    pub dimensions: Vec<DimensionCombination>,
}

impl TestHarness {
    /// Harness over `nodes` with the default site settings.
    pub fn new(nodes: Vec<ContentNode>) -> Self {
        Self {
            backend: Arc::new(InMemoryBackend::new()),
            settings: site_settings(),
            nodes,
            dimensions: Vec::new(),
        }
    }

    pub fn with_dimensions(mut self, dimensions: Vec<DimensionCombination>) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// A fresh indexer over the current node set, writing through the alias.
    pub fn indexer(&self) -> NodeIndexer {
        NodeIndexer::new(
            self.backend.clone(),
            Arc::new(StaticNodeSource::new(self.nodes.clone())),
            Arc::new(StaticDimensions::new(self.dimensions.clone())),
            Arc::new(ConfiguredExtractor::from_settings(&self.settings)),
            &self.settings,
        )
    }

    /// Replace the node with the same identifier, path and workspace.
    pub fn update_node(&mut self, node: ContentNode) {
        match self.nodes.iter_mut().find(|existing| {
            existing.identifier == node.identifier
                && existing.workspace == node.workspace
                && existing.dimensions == node.dimensions
        }) {
            Some(existing) => *existing = node,
            None => self.nodes.push(node),
        }
    }

    /// Run a full rebuild with a fixed postfix.
    pub async fn rebuild(&self, postfix: &str, limit: Option<usize>) -> RebuildResult {
        let mut config = RebuildConfig::default().with_postfix(postfix);
        if let Some(limit) = limit {
            config = config.with_limit(limit);
        }
        let mut indexer = self.indexer();
        rebuild_index(
            &mut indexer,
            &ConfiguredMappingBuilder::from_settings(&self.settings),
            &config,
            Arc::new(NoOpProgressCallback),
        )
        .await
        .expect("rebuild failed")
    }

    /// Index nodes one by one through the alias, then flush.
    pub async fn index(&self, nodes: &[ContentNode]) {
        let mut indexer = self.indexer();
        for node in nodes {
            indexer.index_node(node, None).await.expect("index_node failed");
        }
        indexer.flush().await.expect("flush failed");
    }

    /// Stored source of the document for `path` in the live workspace.
    pub async fn live_document(&self, path: &str, type_name: &str) -> Option<Map<String, Value>> {
        self.backend
            .document(ALIAS, type_name, &document_id(&format!("{}@live", path)))
            .await
    }
}

/// Fulltext root node.
pub fn home(identifier: &str, path: &str, title: &str) -> ContentNode {
    node(identifier, path, "Acme:Home").with_property("title", title)
}

/// Regular page with a title and body.
pub fn page(identifier: &str, path: &str, title: &str, body: &str) -> ContentNode {
    node(identifier, path, "Acme:Page")
        .with_property("title", title)
        .with_property("body", body)
}

/// Content element contributing a title to its fulltext root.
pub fn text(identifier: &str, path: &str, title: &str) -> ContentNode {
    node(identifier, path, "Acme:Text").with_property("title", title)
}

/// Live node of a registered type.
pub fn node(identifier: &str, path: &str, node_type: &str) -> ContentNode {
    ContentNode::new(identifier, path, "live", site_settings().node_type(node_type))
}

/// `count` pages directly below `/sites/a`.
pub fn many_pages(count: usize) -> Vec<ContentNode> {
    let mut nodes = vec![home("site", "/sites/a", "Site")];
    nodes.extend((0..count.saturating_sub(1)).map(|i| {
        page(
            &format!("page-{:03}", i),
            &format!("/sites/a/page-{:03}", i),
            &format!("Page {}", i),
            "",
        )
    }));
    nodes
}
