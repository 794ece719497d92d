//! In-memory search backend.
//!
//! Simulates what the indexer relies on from a real server: bulk requests
//! with per-item results, scripted updates applied atomically under one
//! lock, scroll cursors, and all-or-nothing alias actions. Useful for
//! testing without a running search server.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use crsearch_types::bulk::{FULLTEXT_MERGE_SCRIPT, PRESERVE_FULLTEXT_SCRIPT};
use crsearch_types::document::{FULLTEXT_FIELD, FULLTEXT_PARTS_FIELD};
use crsearch_types::fulltext::{self, FulltextBuckets};
use crsearch_types::{AliasAction, AliasTarget};

use crate::backend::{DocumentHit, ScrollPage, SearchBackend};
use crate::error::BackendError;

/// Default number of hits per scroll page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// (type, id)
type DocumentKey = (String, String);

type ItemResult = Result<(u16, &'static str), (u16, String)>;

#[derive(Default)]
struct State {
    indices: BTreeMap<String, BTreeMap<DocumentKey, Map<String, Value>>>,
    aliases: BTreeMap<String, BTreeSet<String>>,
    mappings: BTreeMap<String, BTreeMap<String, Value>>,
    scrolls: HashMap<String, VecDeque<Vec<DocumentHit>>>,
    next_scroll_id: u64,
    refreshes: BTreeMap<String, usize>,
    bulk_requests: usize,
    failing_ids: BTreeSet<String>,
    unavailable: bool,
}

fn bad_request(reason: impl Into<String>) -> BackendError {
    BackendError::UnexpectedStatus {
        status: 400,
        body: reason.into(),
    }
}

impl State {
    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable {
            return Err(BackendError::UnexpectedStatus {
                status: 503,
                body: "search backend unavailable".to_string(),
            });
        }
        Ok(())
    }

    /// Physical indices behind a name (index or alias).
    fn resolve(&self, name: &str) -> Result<Vec<String>, BackendError> {
        if self.indices.contains_key(name) {
            return Ok(vec![name.to_string()]);
        }
        match self.aliases.get(name) {
            Some(indices) if !indices.is_empty() => Ok(indices.iter().cloned().collect()),
            _ => Err(BackendError::NotFound(format!("no such index [{}]", name))),
        }
    }

    /// Single write target; unknown names are auto-created.
    fn resolve_write(&mut self, name: &str) -> Result<String, String> {
        if self.indices.contains_key(name) {
            return Ok(name.to_string());
        }
        if let Some(indices) = self.aliases.get(name) {
            let mut iter = indices.iter();
            match (iter.next(), iter.next()) {
                (Some(index), None) => return Ok(index.clone()),
                (Some(_), Some(_)) => {
                    return Err(format!(
                        "alias [{}] has more than one index associated with it",
                        name
                    ))
                }
                _ => {}
            }
        }
        self.indices.insert(name.to_string(), BTreeMap::new());
        Ok(name.to_string())
    }

    fn apply_bulk(&mut self, default_index: &str, body: &str) -> Result<Value, BackendError> {
        let mut lines = body.lines().filter(|line| !line.trim().is_empty());
        let mut items = Vec::new();
        let mut errors = false;

        while let Some(line) = lines.next() {
            let header: Value = serde_json::from_str(line)
                .map_err(|e| bad_request(format!("malformed action line: {}", e)))?;
            let (action, meta) = header
                .as_object()
                .and_then(|object| object.iter().next())
                .map(|(action, meta)| (action.clone(), meta.clone()))
                .ok_or_else(|| bad_request("action line must be a single-key object"))?;

            let index = meta
                .get("_index")
                .and_then(Value::as_str)
                .unwrap_or(default_index)
                .to_string();
            let type_name = meta
                .get("_type")
                .and_then(Value::as_str)
                .unwrap_or("_doc")
                .to_string();
            let id = meta
                .get("_id")
                .and_then(Value::as_str)
                .ok_or_else(|| bad_request("action line is missing _id"))?
                .to_string();

            let source = if action == "delete" {
                None
            } else {
                let line = lines
                    .next()
                    .ok_or_else(|| bad_request(format!("missing body line for {}", action)))?;
                Some(
                    serde_json::from_str::<Value>(line)
                        .map_err(|e| bad_request(format!("malformed body line: {}", e)))?,
                )
            };

            let result = self.apply_item(&action, &index, &type_name, &id, source);
            let mut item = json!({ "_index": index, "_type": type_name, "_id": id });
            match result {
                Ok((status, outcome)) => {
                    item["status"] = json!(status);
                    item["result"] = json!(outcome);
                }
                Err((status, reason)) => {
                    errors = true;
                    item["status"] = json!(status);
                    item["error"] = json!({ "type": "simulated_exception", "reason": reason });
                }
            }
            let mut entry = Map::new();
            entry.insert(action, item);
            items.push(Value::Object(entry));
        }

        Ok(json!({ "took": 1, "errors": errors, "items": items }))
    }

    fn apply_item(
        &mut self,
        action: &str,
        index: &str,
        type_name: &str,
        id: &str,
        body: Option<Value>,
    ) -> ItemResult {
        if self.failing_ids.contains(id) {
            return Err((500, format!("injected failure for [{}]", id)));
        }

        let index = self.resolve_write(index).map_err(|reason| (400, reason))?;
        let key = (type_name.to_string(), id.to_string());
        let documents = self.indices.entry(index).or_default();

        match action {
            "index" => match body {
                Some(Value::Object(source)) => match documents.insert(key, source) {
                    Some(_) => Ok((200, "updated")),
                    None => Ok((201, "created")),
                },
                _ => Err((400, "document body must be an object".to_string())),
            },
            "delete" => match documents.remove(&key) {
                Some(_) => Ok((200, "deleted")),
                None => Ok((404, "not_found")),
            },
            "update" => {
                let body = body.unwrap_or(Value::Null);
                if let Some(existing) = documents.get_mut(&key) {
                    apply_script(existing, &body["script"])?;
                    return Ok((200, "updated"));
                }
                match body.get("upsert") {
                    Some(Value::Object(upsert)) => {
                        documents.insert(key, upsert.clone());
                        Ok((201, "created"))
                    }
                    _ => Err((404, format!("[{}]: document missing", id))),
                }
            }
            other => Err((400, format!("unknown bulk action [{}]", other))),
        }
    }
}

/// Run one of the known update scripts against a stored source.
///
/// The merge script maps to `fulltext::merge_into_source`; both visit parts
/// in identifier order.
fn apply_script(source: &mut Map<String, Value>, script: &Value) -> Result<(), (u16, String)> {
    let params = &script["params"];
    match script["source"].as_str() {
        Some(FULLTEXT_MERGE_SCRIPT) => {
            let identifier = params["identifier"]
                .as_str()
                .ok_or_else(|| (400, "missing param [identifier]".to_string()))?;
            let contribution: FulltextBuckets = serde_json::from_value(params["fulltext"].clone())
                .map_err(|e| (400, format!("invalid param [fulltext]: {}", e)))?;
            fulltext::merge_into_source(source, identifier, &contribution)
                .map_err(|e| (400, e.to_string()))
        }
        Some(PRESERVE_FULLTEXT_SCRIPT) => {
            let new_data = params["newData"]
                .as_object()
                .ok_or_else(|| (400, "missing param [newData]".to_string()))?;
            let preserved_fulltext = source.remove(FULLTEXT_FIELD).unwrap_or_else(|| json!({}));
            let preserved_parts = source
                .remove(FULLTEXT_PARTS_FIELD)
                .unwrap_or_else(|| json!({}));
            *source = new_data.clone();
            source.insert(FULLTEXT_FIELD.to_string(), preserved_fulltext);
            source.insert(FULLTEXT_PARTS_FIELD.to_string(), preserved_parts);
            Ok(())
        }
        _ => Err((400, "unsupported script".to_string())),
    }
}

/// Evaluate the subset of the query DSL the indexer uses.
fn matches(
    query: &Value,
    type_name: &str,
    id: &str,
    source: &Map<String, Value>,
) -> Result<bool, BackendError> {
    let (kind, clause) = query
        .as_object()
        .and_then(|object| object.iter().next())
        .ok_or_else(|| bad_request(format!("malformed query clause: {}", query)))?;

    match kind.as_str() {
        "match_all" => Ok(true),
        "ids" => Ok(clause["values"]
            .as_array()
            .map(|values| values.iter().any(|v| v.as_str() == Some(id)))
            .unwrap_or(false)),
        "term" => {
            let (field, expected) = clause
                .as_object()
                .and_then(|object| object.iter().next())
                .ok_or_else(|| bad_request("malformed term clause"))?;
            let expected = expected.get("value").unwrap_or(expected);
            let actual = match field.as_str() {
                "_type" => Value::String(type_name.to_string()),
                "_id" => Value::String(id.to_string()),
                other => source.get(other).cloned().unwrap_or(Value::Null),
            };
            Ok(&actual == expected)
        }
        "bool" => {
            let clauses = |name: &str| -> Vec<Value> {
                match clause.get(name) {
                    Some(Value::Array(items)) => items.clone(),
                    Some(item @ Value::Object(_)) => vec![item.clone()],
                    _ => Vec::new(),
                }
            };
            for must in clauses("must").iter().chain(clauses("filter").iter()) {
                if !matches(must, type_name, id, source)? {
                    return Ok(false);
                }
            }
            for must_not in clauses("must_not") {
                if matches(&must_not, type_name, id, source)? {
                    return Ok(false);
                }
            }
            let should = clauses("should");
            if !should.is_empty() {
                for clause in &should {
                    if matches(clause, type_name, id, source)? {
                        return Ok(true);
                    }
                }
                return Ok(false);
            }
            Ok(true)
        }
        other => Err(bad_request(format!("unsupported query [{}]", other))),
    }
}

/// Simulated [`SearchBackend`] holding everything in memory.
pub struct InMemoryBackend {
    state: Mutex<State>,
    page_size: usize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Create with a custom scroll page size.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: page_size.max(1),
        }
    }

    /// Stored source of a document, resolving aliases.
    pub async fn document(&self, index: &str, type_name: &str, id: &str) -> Option<Map<String, Value>> {
        let state = self.state.lock().await;
        let key = (type_name.to_string(), id.to_string());
        state
            .resolve(index)
            .ok()?
            .iter()
            .find_map(|name| state.indices.get(name)?.get(&key).cloned())
    }

    /// All (type, source) pairs stored under `id`.
    pub async fn documents_with_id(&self, index: &str, id: &str) -> Vec<(String, Map<String, Value>)> {
        let state = self.state.lock().await;
        let Ok(names) = state.resolve(index) else {
            return Vec::new();
        };
        names
            .iter()
            .filter_map(|name| state.indices.get(name))
            .flat_map(|documents| documents.iter())
            .filter(|((_, doc_id), _)| doc_id == id)
            .map(|((type_name, _), source)| (type_name.clone(), source.clone()))
            .collect()
    }

    pub async fn document_count(&self, index: &str) -> usize {
        let state = self.state.lock().await;
        match state.resolve(index) {
            Ok(names) => names
                .iter()
                .filter_map(|name| state.indices.get(name))
                .map(|documents| documents.len())
                .sum(),
            Err(_) => 0,
        }
    }

    /// Store a document directly, creating the index if needed.
    pub async fn insert_document(&self, index: &str, type_name: &str, id: &str, source: Map<String, Value>) {
        let mut state = self.state.lock().await;
        state
            .indices
            .entry(index.to_string())
            .or_default()
            .insert((type_name.to_string(), id.to_string()), source);
    }

    pub async fn mapping(&self, index: &str, type_name: &str) -> Option<Value> {
        let state = self.state.lock().await;
        state.mappings.get(index)?.get(type_name).cloned()
    }

    pub async fn refresh_count(&self, index: &str) -> usize {
        let state = self.state.lock().await;
        state.refreshes.get(index).copied().unwrap_or(0)
    }

    /// Scroll cursors opened and not yet cleared.
    pub async fn open_scroll_count(&self) -> usize {
        self.state.lock().await.scrolls.len()
    }

    pub async fn bulk_request_count(&self) -> usize {
        self.state.lock().await.bulk_requests
    }

    /// Make every bulk item targeting `id` fail.
    pub async fn fail_document(&self, id: &str) {
        self.state.lock().await.failing_ids.insert(id.to_string());
    }

    /// Make every request fail with 503 while set.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    async fn create_index(&self, index: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        if state.indices.contains_key(index) || state.aliases.contains_key(index) {
            return Err(bad_request(format!(
                "resource_already_exists_exception: index [{}] already exists",
                index
            )));
        }
        state.indices.insert(index.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, BackendError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state.indices.contains_key(index) || state.aliases.contains_key(index))
    }

    async fn delete_indices(&self, indices: &[String]) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        if let Some(missing) = indices.iter().find(|name| !state.indices.contains_key(*name)) {
            return Err(BackendError::NotFound(format!("no such index [{}]", missing)));
        }
        for name in indices {
            state.indices.remove(name);
            state.mappings.remove(name);
            for members in state.aliases.values_mut() {
                members.remove(name);
            }
        }
        state.aliases.retain(|_, members| !members.is_empty());
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        for name in state.resolve(index)? {
            *state.refreshes.entry(name).or_insert(0) += 1;
        }
        Ok(())
    }

    async fn put_mapping(
        &self,
        index: &str,
        type_name: &str,
        mapping: &Value,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        for name in state.resolve(index)? {
            state
                .mappings
                .entry(name)
                .or_default()
                .insert(type_name.to_string(), mapping.clone());
        }
        Ok(())
    }

    async fn bulk(&self, index: &str, body: String) -> Result<String, BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        state.bulk_requests += 1;
        let response = state.apply_bulk(index, &body)?;
        Ok(serde_json::to_string(&response)?)
    }

    async fn open_scroll(
        &self,
        index: &str,
        query: &Value,
        _keep_alive: &str,
    ) -> Result<ScrollPage, BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;

        let match_all = json!({ "match_all": {} });
        let query = query.get("query").unwrap_or(&match_all);
        let mut hits = Vec::new();
        for name in state.resolve(index)? {
            if let Some(documents) = state.indices.get(&name) {
                for ((type_name, id), source) in documents {
                    if matches(query, type_name, id, source)? {
                        hits.push(DocumentHit {
                            index: name.clone(),
                            type_name: type_name.clone(),
                            id: id.clone(),
                        });
                    }
                }
            }
        }

        let mut pages: VecDeque<Vec<DocumentHit>> =
            hits.chunks(self.page_size).map(|chunk| chunk.to_vec()).collect();
        let first = pages.pop_front().unwrap_or_default();

        state.next_scroll_id += 1;
        let scroll_id = format!("scroll-{}", state.next_scroll_id);
        state.scrolls.insert(scroll_id.clone(), pages);

        Ok(ScrollPage {
            scroll_id,
            hits: first,
        })
    }

    async fn next_scroll_page(
        &self,
        scroll_id: &str,
        _keep_alive: &str,
    ) -> Result<ScrollPage, BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let pages = state
            .scrolls
            .get_mut(scroll_id)
            .ok_or_else(|| BackendError::NotFound(format!("scroll [{}]", scroll_id)))?;
        Ok(ScrollPage {
            scroll_id: scroll_id.to_string(),
            hits: pages.pop_front().unwrap_or_default(),
        })
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        state
            .scrolls
            .remove(scroll_id)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(format!("scroll [{}]", scroll_id)))
    }

    async fn aliased_indices(&self, alias: &str) -> Result<Vec<String>, BackendError> {
        let state = self.state.lock().await;
        state.check_available()?;
        match state.aliases.get(alias) {
            Some(indices) if !indices.is_empty() => Ok(indices.iter().cloned().collect()),
            _ => Err(BackendError::NotFound(format!("alias [{}] missing", alias))),
        }
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;

        // Validate and apply against a copy; commit only if every action succeeds.
        let mut aliases = state.aliases.clone();
        for action in actions {
            match action {
                AliasAction::Add(AliasTarget { index, alias }) => {
                    if !state.indices.contains_key(index) {
                        return Err(BackendError::NotFound(format!("no such index [{}]", index)));
                    }
                    if state.indices.contains_key(alias) {
                        return Err(bad_request(format!(
                            "invalid_alias_name_exception: an index exists with the same name as the alias [{}]",
                            alias
                        )));
                    }
                    aliases.entry(alias.clone()).or_default().insert(index.clone());
                }
                AliasAction::Remove(AliasTarget { index, alias }) => {
                    let removed = aliases
                        .get_mut(alias)
                        .map(|members| members.remove(index))
                        .unwrap_or(false);
                    if !removed {
                        return Err(BackendError::NotFound(format!(
                            "aliases [{}] missing on index [{}]",
                            alias, index
                        )));
                    }
                }
            }
        }
        aliases.retain(|_, members| !members.is_empty());
        state.aliases = aliases;
        Ok(())
    }

    async fn list_indices(&self) -> Result<Vec<String>, BackendError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state.indices.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crsearch_types::{BulkOperation, SearchDocument, UpdateScript};

    fn page(id: &str, title: &str) -> SearchDocument {
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!(title));
        SearchDocument::new(id, "Acme-Page", fields)
    }

    fn ndjson(ops: &[BulkOperation]) -> String {
        ops.iter().map(|op| op.to_ndjson().unwrap()).collect()
    }

    fn merge(root: &str, node: &str, text: &str) -> BulkOperation {
        let mut fulltext = FulltextBuckets::new();
        if !text.is_empty() {
            fulltext.insert("h1".to_string(), text.to_string());
        }
        BulkOperation::Update {
            index: "idx".to_string(),
            type_name: "Acme-Page".to_string(),
            id: root.to_string(),
            script: UpdateScript::MergeFulltext {
                identifier: node.to_string(),
                fulltext,
            },
            retry_on_conflict: 3,
        }
    }

    #[tokio::test]
    async fn test_bulk_index_and_delete() {
        let backend = InMemoryBackend::new();
        backend.create_index("idx").await.unwrap();

        let response = backend
            .bulk(
                "idx",
                ndjson(&[
                    BulkOperation::index("idx", &page("a", "A")),
                    BulkOperation::index("idx", &page("b", "B")),
                    BulkOperation::delete("idx", "Acme-Page", "a"),
                ]),
            )
            .await
            .unwrap();

        let response: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(response["errors"], false);
        assert_eq!(response["items"].as_array().unwrap().len(), 3);
        assert!(backend.document("idx", "Acme-Page", "a").await.is_none());
        assert_eq!(backend.document("idx", "Acme-Page", "b").await.unwrap()["title"], "B");
    }

    #[tokio::test]
    async fn test_bulk_reports_injected_failures_per_item() {
        let backend = InMemoryBackend::new();
        backend.fail_document("a").await;

        let response = backend
            .bulk(
                "idx",
                ndjson(&[
                    BulkOperation::index("idx", &page("a", "A")),
                    BulkOperation::index("idx", &page("b", "B")),
                ]),
            )
            .await
            .unwrap();

        let response: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(response["errors"], true);
        assert!(response["items"][0]["index"]["error"].is_object());
        assert!(backend.document("idx", "Acme-Page", "b").await.is_some());
    }

    #[tokio::test]
    async fn test_merge_script_upserts_then_merges() {
        let backend = InMemoryBackend::new();
        backend
            .bulk("idx", ndjson(&[merge("root", "p", "Parent"), merge("root", "c", "Child")]))
            .await
            .unwrap();

        let doc = backend.document("idx", "Acme-Page", "root").await.unwrap();
        assert_eq!(doc[FULLTEXT_FIELD]["h1"], "Child Parent");

        backend.bulk("idx", ndjson(&[merge("root", "c", "")])).await.unwrap();
        let doc = backend.document("idx", "Acme-Page", "root").await.unwrap();
        assert_eq!(doc[FULLTEXT_FIELD]["h1"], "Parent");
        assert!(doc[FULLTEXT_PARTS_FIELD].get("c").is_none());
    }

    #[tokio::test]
    async fn test_preserve_script_keeps_aggregate() {
        let backend = InMemoryBackend::new();
        backend.bulk("idx", ndjson(&[merge("root", "c", "Child")])).await.unwrap();

        let update = BulkOperation::Update {
            index: "idx".to_string(),
            type_name: "Acme-Page".to_string(),
            id: "root".to_string(),
            script: UpdateScript::ReplacePreservingFulltext {
                data: page("root", "Home").fields,
            },
            retry_on_conflict: 3,
        };
        backend.bulk("idx", ndjson(&[update])).await.unwrap();

        let doc = backend.document("idx", "Acme-Page", "root").await.unwrap();
        assert_eq!(doc["title"], "Home");
        assert_eq!(doc[FULLTEXT_FIELD]["h1"], "Child");
    }

    #[tokio::test]
    async fn test_scroll_pages_and_query() {
        let backend = InMemoryBackend::with_page_size(2);
        for type_name in ["Old-A", "Old-B", "Old-C", "Current"] {
            backend.insert_document("idx", type_name, "doc", Map::new()).await;
        }
        backend.insert_document("idx", "Old-A", "other", Map::new()).await;

        let query = json!({
            "query": {"bool": {
                "must": {"ids": {"values": ["doc"]}},
                "must_not": {"term": {"_type": "Current"}}
            }}
        });
        let mut page = backend.open_scroll("idx", &query, "1m").await.unwrap();
        let mut seen = Vec::new();
        while !page.is_empty() {
            seen.extend(page.hits.iter().map(|hit| hit.type_name.clone()));
            page = backend.next_scroll_page(&page.scroll_id, "1m").await.unwrap();
        }
        assert_eq!(seen, vec!["Old-A", "Old-B", "Old-C"]);
        assert_eq!(backend.open_scroll_count().await, 1);

        backend.clear_scroll(&page.scroll_id).await.unwrap();
        assert_eq!(backend.open_scroll_count().await, 0);
    }

    #[tokio::test]
    async fn test_alias_actions_are_atomic() {
        let backend = InMemoryBackend::new();
        backend.create_index("site-1").await.unwrap();
        backend
            .update_aliases(&[AliasAction::add("site-1", "site")])
            .await
            .unwrap();

        // Second action targets a missing index: nothing may change.
        let err = backend
            .update_aliases(&[
                AliasAction::remove("site-1", "site"),
                AliasAction::add("site-2", "site"),
            ])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(backend.aliased_indices("site").await.unwrap(), vec!["site-1"]);
    }

    #[tokio::test]
    async fn test_missing_alias_is_not_found() {
        let backend = InMemoryBackend::new();
        assert!(backend.aliased_indices("site").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_writes_through_alias() {
        let backend = InMemoryBackend::new();
        backend.create_index("site-1").await.unwrap();
        backend
            .update_aliases(&[AliasAction::add("site-1", "site")])
            .await
            .unwrap();

        backend
            .bulk("site", ndjson(&[BulkOperation::index("site", &page("a", "A"))]))
            .await
            .unwrap();
        assert_eq!(backend.document_count("site-1").await, 1);
        assert_eq!(backend.list_indices().await.unwrap(), vec!["site-1"]);
    }

    #[tokio::test]
    async fn test_delete_indices_drops_aliases() {
        let backend = InMemoryBackend::new();
        backend.create_index("site-1").await.unwrap();
        backend
            .update_aliases(&[AliasAction::add("site-1", "site")])
            .await
            .unwrap();
        backend.delete_indices(&["site-1".to_string()]).await.unwrap();

        assert!(!backend.index_exists("site").await.unwrap());
        assert!(backend.list_indices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_backend() {
        let backend = InMemoryBackend::new();
        backend.set_unavailable(true).await;
        let err = backend.create_index("idx").await.unwrap_err();
        assert!(matches!(err, BackendError::UnexpectedStatus { status: 503, .. }));
    }
}
