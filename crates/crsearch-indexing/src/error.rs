//! Error types for the indexing pipeline.

use crsearch_client::BackendError;
use crsearch_types::CoreError;
use thiserror::Error;

/// Errors that can occur in the indexing pipeline
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Search backend request failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Value model error (hashing, settings, fulltext parts)
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Node source lookup failed
    #[error("Node source error: {0}")]
    Source(String),

    /// Type mapping could not be built or applied
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Stale documents could not be removed
    #[error("Reconciliation error: {0}")]
    Reconciliation(String),

    /// Publishing attempted on an index that is not namespaced below its alias
    #[error("Index name {index} equals alias {alias}; set an index name postfix before publishing")]
    MissingIndexPostfix { index: String, alias: String },

    /// Publishing attempted against an index that does not exist
    #[error("Index {index} does not exist; cannot point the alias at it")]
    TargetIndexMissing { index: String },

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for IndexingError {
    fn from(err: serde_json::Error) -> Self {
        IndexingError::Serialization(err.to_string())
    }
}
