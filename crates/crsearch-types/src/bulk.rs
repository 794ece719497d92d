//! Bulk operations and their newline-delimited wire encoding.
//!
//! Each operation encodes to one header line (`index`, `update` or
//! `delete` with `_index`/`_type`/`_id`) and, except for deletes, one
//! body line.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::document::{SearchDocument, FULLTEXT_FIELD, FULLTEXT_PARTS_FIELD};
use crate::error::CoreError;
use crate::fulltext::{self, FulltextBuckets};

/// Painless script merging one node's contribution into `__fulltextParts`
/// and re-deriving `__fulltext`. Runs atomically on the backend.
///
/// Parts are visited in identifier order through a `TreeMap`, the same
/// order [`fulltext::aggregate`] uses, so the aggregate does not depend on
/// the order in which the backend stored the parts.
pub const FULLTEXT_MERGE_SCRIPT: &str = "\
if (ctx._source.__fulltextParts == null) { ctx._source.__fulltextParts = new HashMap(); } \
if (params.fulltext.size() == 0) { ctx._source.__fulltextParts.remove(params.identifier); } \
else { ctx._source.__fulltextParts.put(params.identifier, params.fulltext); } \
Map fulltext = new HashMap(); \
for (def part : new TreeMap(ctx._source.__fulltextParts).values()) { \
  for (def entry : part.entrySet()) { \
    String content = entry.getValue().trim(); \
    if (fulltext.containsKey(entry.getKey())) { fulltext.put(entry.getKey(), fulltext.get(entry.getKey()) + ' ' + content); } \
    else { fulltext.put(entry.getKey(), content); } \
  } \
} \
ctx._source.__fulltext = fulltext;";

/// Painless script replacing a fulltext root document's data while keeping
/// its `__fulltext` and `__fulltextParts`.
pub const PRESERVE_FULLTEXT_SCRIPT: &str = "\
def fulltext = ctx._source.containsKey('__fulltext') ? ctx._source.__fulltext : new HashMap(); \
def parts = ctx._source.containsKey('__fulltextParts') ? ctx._source.__fulltextParts : new HashMap(); \
ctx._source.clear(); \
ctx._source.putAll(params.newData); \
ctx._source.__fulltext = fulltext; \
ctx._source.__fulltextParts = parts;";

/// Server-side update applied by an `update` operation.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateScript {
    /// Merge a node's fulltext into a fulltext root's aggregate.
    MergeFulltext {
        identifier: String,
        fulltext: FulltextBuckets,
    },
    /// Replace document data, keeping the aggregate fields.
    ReplacePreservingFulltext { data: Map<String, Value> },
}

impl UpdateScript {
    pub fn source(&self) -> &'static str {
        match self {
            UpdateScript::MergeFulltext { .. } => FULLTEXT_MERGE_SCRIPT,
            UpdateScript::ReplacePreservingFulltext { .. } => PRESERVE_FULLTEXT_SCRIPT,
        }
    }

    pub fn params(&self) -> Value {
        match self {
            UpdateScript::MergeFulltext {
                identifier,
                fulltext,
            } => json!({ "identifier": identifier, "fulltext": fulltext }),
            UpdateScript::ReplacePreservingFulltext { data } => json!({ "newData": data }),
        }
    }

    /// Document created when the target does not exist yet.
    pub fn upsert(&self) -> Result<Value, CoreError> {
        match self {
            UpdateScript::MergeFulltext {
                identifier,
                fulltext,
            } => Ok(Value::Object(fulltext::initial_source(identifier, fulltext)?)),
            UpdateScript::ReplacePreservingFulltext { data } => {
                let mut upsert = data.clone();
                upsert
                    .entry(FULLTEXT_FIELD.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                upsert
                    .entry(FULLTEXT_PARTS_FIELD.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                Ok(Value::Object(upsert))
            }
        }
    }
}

/// One write instruction in a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    Index {
        index: String,
        type_name: String,
        id: String,
        document: Map<String, Value>,
    },
    Update {
        index: String,
        type_name: String,
        id: String,
        script: UpdateScript,
        retry_on_conflict: u32,
    },
    Delete {
        index: String,
        type_name: String,
        id: String,
    },
}

impl BulkOperation {
    /// Plain index (replace) of a document.
    pub fn index(index: impl Into<String>, document: &SearchDocument) -> Self {
        BulkOperation::Index {
            index: index.into(),
            type_name: document.type_name.clone(),
            id: document.id.clone(),
            document: document.fields.clone(),
        }
    }

    pub fn delete(index: impl Into<String>, type_name: impl Into<String>, id: impl Into<String>) -> Self {
        BulkOperation::Delete {
            index: index.into(),
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            BulkOperation::Index { .. } => "index",
            BulkOperation::Update { .. } => "update",
            BulkOperation::Delete { .. } => "delete",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            BulkOperation::Index { id, .. }
            | BulkOperation::Update { id, .. }
            | BulkOperation::Delete { id, .. } => id,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            BulkOperation::Index { type_name, .. }
            | BulkOperation::Update { type_name, .. }
            | BulkOperation::Delete { type_name, .. } => type_name,
        }
    }

    pub fn index_name(&self) -> &str {
        match self {
            BulkOperation::Index { index, .. }
            | BulkOperation::Update { index, .. }
            | BulkOperation::Delete { index, .. } => index,
        }
    }

    /// Action/metadata line.
    pub fn header(&self) -> Value {
        let mut meta = Map::new();
        meta.insert("_index".to_string(), Value::String(self.index_name().to_string()));
        meta.insert("_type".to_string(), Value::String(self.type_name().to_string()));
        meta.insert("_id".to_string(), Value::String(self.id().to_string()));
        if let BulkOperation::Update {
            retry_on_conflict, ..
        } = self
        {
            meta.insert("retry_on_conflict".to_string(), json!(retry_on_conflict));
        }

        let mut header = Map::new();
        header.insert(self.action().to_string(), Value::Object(meta));
        Value::Object(header)
    }

    /// Source line, `None` for deletes.
    pub fn body(&self) -> Result<Option<Value>, CoreError> {
        match self {
            BulkOperation::Index { document, .. } => Ok(Some(Value::Object(document.clone()))),
            BulkOperation::Update { script, .. } => Ok(Some(json!({
                "script": {
                    "lang": "painless",
                    "source": script.source(),
                    "params": script.params(),
                },
                "upsert": script.upsert()?,
            }))),
            BulkOperation::Delete { .. } => Ok(None),
        }
    }

    /// Encode as newline-terminated NDJSON lines.
    pub fn to_ndjson(&self) -> Result<String, CoreError> {
        let mut lines = serde_json::to_string(&self.header())?;
        lines.push('\n');
        if let Some(body) = self.body()? {
            lines.push_str(&serde_json::to_string(&body)?);
            lines.push('\n');
        }
        Ok(lines)
    }
}

/// Index/alias pair used in alias actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTarget {
    pub index: String,
    pub alias: String,
}

/// One action of an atomic alias update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasAction {
    Add(AliasTarget),
    Remove(AliasTarget),
}

impl AliasAction {
    pub fn add(index: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasAction::Add(AliasTarget {
            index: index.into(),
            alias: alias.into(),
        })
    }

    pub fn remove(index: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasAction::Remove(AliasTarget {
            index: index.into(),
            alias: alias.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_document() -> SearchDocument {
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!("Home"));
        SearchDocument::new("abc", "Acme-Page", fields)
    }

    #[test]
    fn test_index_operation_lines() {
        let op = BulkOperation::index("crsearch-1", &page_document());
        let ndjson = op.to_ndjson().unwrap();
        let lines: Vec<&str> = ndjson.lines().collect();

        assert_eq!(lines.len(), 2);
        let header: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(header["index"]["_id"], "abc");
        assert_eq!(header["index"]["_type"], "Acme-Page");
        assert_eq!(header["index"]["_index"], "crsearch-1");
        let body: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(body["title"], "Home");
        assert!(ndjson.ends_with('\n'));
    }

    #[test]
    fn test_delete_has_no_body() {
        let op = BulkOperation::delete("crsearch", "Acme-Page", "abc");
        let ndjson = op.to_ndjson().unwrap();
        assert_eq!(ndjson.lines().count(), 1);
        assert!(ndjson.contains("\"delete\""));
        assert!(op.body().unwrap().is_none());
    }

    #[test]
    fn test_merge_update_body() {
        let mut fulltext = FulltextBuckets::new();
        fulltext.insert("h1".to_string(), " Title ".to_string());
        let op = BulkOperation::Update {
            index: "crsearch".to_string(),
            type_name: "Acme-Page".to_string(),
            id: "root".to_string(),
            script: UpdateScript::MergeFulltext {
                identifier: "child".to_string(),
                fulltext,
            },
            retry_on_conflict: 3,
        };

        let header = op.header();
        assert_eq!(header["update"]["retry_on_conflict"], 3);

        let body = op.body().unwrap().unwrap();
        assert_eq!(body["script"]["source"], FULLTEXT_MERGE_SCRIPT);
        assert_eq!(body["script"]["params"]["identifier"], "child");
        assert_eq!(body["upsert"]["__fulltext"]["h1"], "Title");
        assert_eq!(body["upsert"]["__fulltextParts"]["child"]["h1"], " Title ");
    }

    #[test]
    fn test_merge_script_visits_parts_in_identifier_order() {
        assert!(FULLTEXT_MERGE_SCRIPT
            .contains("for (def part : new TreeMap(ctx._source.__fulltextParts).values())"));
        assert!(!FULLTEXT_MERGE_SCRIPT.contains("__fulltextParts.values()"));
    }

    #[test]
    fn test_preserving_update_upsert_carries_empty_aggregate() {
        let script = UpdateScript::ReplacePreservingFulltext {
            data: page_document().fields,
        };
        let upsert = script.upsert().unwrap();
        assert_eq!(upsert["title"], "Home");
        assert_eq!(upsert["__fulltext"], json!({}));
        assert_eq!(script.params()["newData"]["title"], "Home");
    }

    #[test]
    fn test_alias_action_serialization() {
        let actions = vec![
            AliasAction::remove("crsearch-1", "crsearch"),
            AliasAction::add("crsearch-2", "crsearch"),
        ];
        let json = serde_json::to_value(&actions).unwrap();
        assert_eq!(
            json,
            json!([
                {"remove": {"index": "crsearch-1", "alias": "crsearch"}},
                {"add": {"index": "crsearch-2", "alias": "crsearch"}}
            ])
        );
    }
}
