//! Search document and index handle value objects.

use md5::Md5;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha1::{Digest, Sha1};

use crate::error::CoreError;
use crate::node::DimensionCombination;

/// Effective workspace of the indexed node.
pub const WORKSPACE_FIELD: &str = "__workspace";
/// Dimension combination of the indexed node.
pub const DIMENSION_COMBINATIONS_FIELD: &str = "__dimensionCombinations";
/// Hex MD5 of the canonical JSON encoding of the dimension combination.
pub const DIMENSION_COMBINATION_HASH_FIELD: &str = "__dimensionCombinationHash";
pub const IDENTIFIER_FIELD: &str = "__identifier";
pub const PATH_FIELD: &str = "__path";
/// Aggregated fulltext (bucket -> text) on fulltext root documents.
pub const FULLTEXT_FIELD: &str = "__fulltext";
/// Per contributing node fulltext (identifier -> bucket -> text).
pub const FULLTEXT_PARTS_FIELD: &str = "__fulltextParts";

/// Deterministic document id for a context path (hex SHA-1).
pub fn document_id(context_path: &str) -> String {
    hex::encode(Sha1::digest(context_path.as_bytes()))
}

/// Hash of a dimension combination (hex MD5 of its JSON encoding).
pub fn dimension_hash(dimensions: &DimensionCombination) -> Result<String, CoreError> {
    let encoded = serde_json::to_string(dimensions)?;
    Ok(hex::encode(Md5::digest(encoded.as_bytes())))
}

/// A document ready to be written to the search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    /// Hash of the context path; re-indexing the same context replaces the document
    pub id: String,

    /// Backend type name (converted node type name)
    #[serde(rename = "type")]
    pub type_name: String,

    pub fields: Map<String, Value>,
}

impl SearchDocument {
    pub fn new(id: impl Into<String>, type_name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Physical index name plus the alias readers use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHandle {
    /// Physical index name (`alias` or `alias-postfix`)
    pub name: String,
    /// Stable alias name
    pub alias: String,
}

impl IndexHandle {
    /// Create a handle; an empty postfix yields the bare alias name.
    pub fn new(alias: impl Into<String>, postfix: Option<&str>) -> Self {
        let alias = alias.into();
        let name = match postfix {
            Some(postfix) if !postfix.is_empty() => format!("{}-{}", alias, postfix),
            _ => alias.clone(),
        };
        Self { name, alias }
    }

    /// Whether the physical name differs from the alias.
    pub fn is_namespaced(&self) -> bool {
        self.name != self.alias
    }

    /// Prefix shared by every physical index built for this alias.
    pub fn prefix(&self) -> String {
        format!("{}-", self.alias)
    }

    /// Whether `index_name` is a physical index built for this alias.
    pub fn owns(&self, index_name: &str) -> bool {
        index_name.starts_with(&self.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_is_sha1_hex() {
        // sha1("abc")
        assert_eq!(document_id("abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(document_id("/sites/a/page1@live").len(), 40);
    }

    #[test]
    fn test_document_id_is_stable() {
        let first = document_id("/sites/a/page1@live");
        let second = document_id("/sites/a/page1@live");
        assert_eq!(first, second);
        assert_ne!(first, document_id("/sites/a/page1@user-admin"));
    }

    #[test]
    fn test_dimension_hash() {
        let empty = DimensionCombination::new();
        // md5("{}")
        assert_eq!(
            dimension_hash(&empty).unwrap(),
            "99914b932bd37a50b983c5e7c90ae93b"
        );

        let mut dims = DimensionCombination::new();
        dims.insert("language".to_string(), vec!["de".to_string()]);
        let hash = dimension_hash(&dims).unwrap();
        assert_eq!(hash.len(), 32);
        assert_ne!(hash, dimension_hash(&empty).unwrap());
    }

    #[test]
    fn test_index_handle() {
        let handle = IndexHandle::new("crsearch", Some("1700000000"));
        assert_eq!(handle.name, "crsearch-1700000000");
        assert!(handle.is_namespaced());
        assert!(handle.owns("crsearch-1600000000"));
        assert!(!handle.owns("crsearch"));
        assert!(!handle.owns("crsearchother-1"));

        let bare = IndexHandle::new("crsearch", None);
        assert_eq!(bare.name, "crsearch");
        assert!(!bare.is_namespaced());

        let empty = IndexHandle::new("crsearch", Some(""));
        assert!(!empty.is_namespaced());
    }
}
