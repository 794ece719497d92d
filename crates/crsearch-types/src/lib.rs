//! # crsearch-types
//!
//! Shared value types for the content search indexer.
//!
//! - Content nodes and node types, as supplied by a node source
//! - Search documents, bulk operations and index handles
//! - The fulltext aggregation algorithm
//! - Settings: layered configuration

pub mod bulk;
pub mod config;
pub mod document;
pub mod error;
pub mod fulltext;
pub mod node;

pub use bulk::{AliasAction, AliasTarget, BulkOperation, UpdateScript};
pub use config::{
    BackendSettings, IndexingSettings, NodeTypeSchema, PropertySchema, Settings,
};
pub use document::{dimension_hash, document_id, IndexHandle, SearchDocument};
pub use error::CoreError;
pub use fulltext::{FulltextBuckets, FulltextParts};
pub use node::{
    mapping_name_for, ContentNode, DimensionCombination, FulltextSettings, NodeType,
    LIVE_WORKSPACE, UNSTRUCTURED_NODE_TYPE,
};
