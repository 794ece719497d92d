//! Search backend trait definition.
//!
//! Abstracts the external search engine so the indexing core can run
//! against an Elasticsearch-compatible HTTP server or the in-memory
//! simulator used in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crsearch_types::AliasAction;

use crate::error::BackendError;

/// A document reference returned by a scroll search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHit {
    #[serde(rename = "_index")]
    pub index: String,

    #[serde(rename = "_type", default)]
    pub type_name: String,

    #[serde(rename = "_id")]
    pub id: String,
}

/// One page of a scroll cursor.
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    pub scroll_id: String,
    pub hits: Vec<DocumentHit>,
}

impl ScrollPage {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Operations the indexer needs from the search backend.
///
/// Every call is a single request/response; implementations must not
/// retry on their own.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Create a physical index. Fails if the name is taken.
    async fn create_index(&self, index: &str) -> Result<(), BackendError>;

    /// Whether an index (or alias) with this name exists.
    async fn index_exists(&self, index: &str) -> Result<bool, BackendError>;

    /// Delete the given physical indices in one request.
    async fn delete_indices(&self, indices: &[String]) -> Result<(), BackendError>;

    /// Make all writes to the index visible to searches.
    async fn refresh(&self, index: &str) -> Result<(), BackendError>;

    /// Apply a type mapping to an index.
    async fn put_mapping(
        &self,
        index: &str,
        type_name: &str,
        mapping: &Value,
    ) -> Result<(), BackendError>;

    /// Submit a newline-delimited bulk body. Returns the raw response body;
    /// per-item failures are reported inside it, not as an `Err`.
    async fn bulk(&self, index: &str, body: String) -> Result<String, BackendError>;

    /// Open a time-bounded scroll cursor for `query` and return the first page.
    async fn open_scroll(
        &self,
        index: &str,
        query: &Value,
        keep_alive: &str,
    ) -> Result<ScrollPage, BackendError>;

    /// Fetch the next page of an open cursor. An empty page ends the scan.
    async fn next_scroll_page(
        &self,
        scroll_id: &str,
        keep_alive: &str,
    ) -> Result<ScrollPage, BackendError>;

    /// Release a scroll cursor.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), BackendError>;

    /// Physical indices currently holding `alias`.
    ///
    /// Returns [`BackendError::NotFound`] when the alias does not exist.
    async fn aliased_indices(&self, alias: &str) -> Result<Vec<String>, BackendError>;

    /// Apply all alias actions atomically.
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), BackendError>;

    /// Names of all physical indices.
    async fn list_indices(&self) -> Result<Vec<String>, BackendError>;
}
