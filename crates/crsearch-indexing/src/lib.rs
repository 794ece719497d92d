//! Indexing pipeline for the content search indexer.
//!
//! This crate turns content-node changes into search backend writes and
//! manages the lifecycle of the physical indices behind a stable alias.
//!
//! ## Key Components
//!
//! - [`NodeIndexer`]: per-change entry point (`index_node`, `remove_node`, `flush`)
//! - [`decide`]: pure per-node decision (skip, delete or upsert)
//! - [`BulkWriteBuffer`]: queues bulk operations and submits them in one request
//! - [`FulltextAggregator`]: merges fulltext into the nearest fulltext root
//! - [`DuplicateReconciler`]: removes documents left behind by type changes
//! - [`IndexLifecycleManager`]: atomic alias switch and old index cleanup
//! - [`rebuild_index`]: full rebuild into a fresh index
//!
//! ## Collaborators
//!
//! Content comes from a [`NodeSource`] and a [`DimensionProvider`]; fields
//! from a [`PropertyExtractor`]; type mappings from a [`MappingBuilder`].
//! Settings-driven implementations of each are included.
//!
//! ## Example
//!
//! ```ignore
//! let mut indexer = NodeIndexer::new(backend, source, dimensions, extractor, &settings);
//! indexer.index_node(&node, Some("live")).await?;
//! let report = indexer.flush().await?;
//! ```

pub mod buffer;
pub mod document;
pub mod error;
pub mod extract;
pub mod fulltext;
pub mod indexer;
pub mod lifecycle;
pub mod mapping;
pub mod rebuild;
pub mod reconcile;
pub mod source;

pub use buffer::{BulkWriteBuffer, FailedItem, FlushReport};
pub use document::{decide, effective_workspace, IndexDecision, SkipReason, WorkspacePolicy};
pub use error::IndexingError;
pub use extract::{ConfiguredExtractor, Extraction, PropertyExtractor};
pub use fulltext::FulltextAggregator;
pub use indexer::NodeIndexer;
pub use lifecycle::IndexLifecycleManager;
pub use mapping::{ConfiguredMappingBuilder, MappingBuilder, MappingCollection, TypeMapping};
pub use rebuild::{
    rebuild_index, LoggingProgressCallback, NoOpProgressCallback, ProgressCallback,
    RebuildConfig, RebuildProgress, RebuildResult, RebuildState,
};
pub use reconcile::DuplicateReconciler;
pub use source::{DimensionProvider, NodeRecord, NodeSource, StaticDimensions, StaticNodeSource};
