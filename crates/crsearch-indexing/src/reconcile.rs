//! Removal of stale documents left behind by node type changes.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crsearch_client::{DocumentHit, ScrollPage, SearchBackend};
use crsearch_types::{BulkOperation, Settings};

use crate::error::IndexingError;

/// Deletes documents sharing an id with a node but carrying another type.
#[derive(Debug, Clone)]
pub struct DuplicateReconciler {
    keep_alive: String,
}

impl DuplicateReconciler {
    pub fn new(keep_alive: impl Into<String>) -> Self {
        Self {
            keep_alive: keep_alive.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.indexing.scroll_keep_alive.clone())
    }

    /// Query matching `id` under any type other than `current_type`.
    pub fn query(id: &str, current_type: &str) -> Value {
        json!({
            "query": {
                "bool": {
                    "must": { "ids": { "values": [id] } },
                    "must_not": { "term": { "_type": current_type } }
                }
            }
        })
    }

    /// Remove stale documents; returns how many were deleted.
    pub async fn reconcile(
        &self,
        backend: &dyn SearchBackend,
        index: &str,
        id: &str,
        current_type: &str,
    ) -> Result<usize, IndexingError> {
        let query = Self::query(id, current_type);
        let first = match backend.open_scroll(index, &query, &self.keep_alive).await {
            Ok(page) => page,
            // Nothing can be stale in an index that does not exist yet.
            Err(e) if e.is_not_found() => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut scroll_id = first.scroll_id.clone();

        let collected = self.collect(backend, first, &mut scroll_id).await;
        if let Err(e) = backend.clear_scroll(&scroll_id).await {
            warn!(scroll_id = %scroll_id, error = %e, "Failed to clear scroll");
        }
        let hits = collected?;

        if hits.is_empty() {
            return Ok(0);
        }

        let mut body = String::new();
        for hit in &hits {
            let operation = BulkOperation::delete(hit.index.clone(), hit.type_name.clone(), hit.id.clone());
            body.push_str(&operation.to_ndjson()?);
        }

        let response = backend.bulk(index, body).await?;
        let response: Value = serde_json::from_str(&response)?;
        if response.get("errors").and_then(Value::as_bool).unwrap_or(false) {
            return Err(IndexingError::Reconciliation(format!(
                "deleting stale documents for {} failed: {}",
                id, response
            )));
        }

        info!(doc_id = %id, removed = hits.len(), "Removed stale documents of other types");
        Ok(hits.len())
    }

    async fn collect(
        &self,
        backend: &dyn SearchBackend,
        first: ScrollPage,
        scroll_id: &mut String,
    ) -> Result<Vec<DocumentHit>, IndexingError> {
        let mut hits = Vec::new();
        let mut page = first;
        while !page.is_empty() {
            debug!(count = page.hits.len(), "Stale document page");
            hits.append(&mut page.hits);
            page = backend.next_scroll_page(scroll_id, &self.keep_alive).await?;
            *scroll_id = page.scroll_id.clone();
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crsearch_client::InMemoryBackend;
    use serde_json::Map;

    async fn seeded(page_size: usize) -> InMemoryBackend {
        let backend = InMemoryBackend::with_page_size(page_size);
        for type_name in ["Acme-OldPage", "Acme-Legacy", "Acme-Page"] {
            backend.insert_document("idx", type_name, "doc", Map::new()).await;
        }
        backend.insert_document("idx", "Acme-OldPage", "other", Map::new()).await;
        backend
    }

    #[tokio::test]
    async fn test_removes_only_other_types_of_same_id() {
        let backend = seeded(1).await;
        let reconciler = DuplicateReconciler::new("1m");

        let removed = reconciler
            .reconcile(&backend, "idx", "doc", "Acme-Page")
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(backend.documents_with_id("idx", "doc").await.len(), 1);
        assert!(backend.document("idx", "Acme-Page", "doc").await.is_some());
        assert!(backend.document("idx", "Acme-OldPage", "other").await.is_some());
        assert_eq!(backend.open_scroll_count().await, 0);
    }

    #[tokio::test]
    async fn test_nothing_to_remove() {
        let backend = seeded(10).await;
        let reconciler = DuplicateReconciler::new("1m");

        let removed = reconciler
            .reconcile(&backend, "idx", "missing", "Acme-Page")
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert_eq!(backend.bulk_request_count().await, 0);
        assert_eq!(backend.open_scroll_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_index_has_no_duplicates() {
        let backend = InMemoryBackend::new();
        let reconciler = DuplicateReconciler::new("1m");
        let removed = reconciler
            .reconcile(&backend, "idx", "doc", "Acme-Page")
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_failed_delete_aborts() {
        let backend = seeded(10).await;
        backend.fail_document("doc").await;
        let reconciler = DuplicateReconciler::new("1m");

        let err = reconciler
            .reconcile(&backend, "idx", "doc", "Acme-Page")
            .await
            .unwrap_err();
        assert!(matches!(err, IndexingError::Reconciliation(_)));
        assert_eq!(backend.open_scroll_count().await, 0);
    }
}
