//! Fulltext aggregation algorithm.
//!
//! A fulltext root document carries `__fulltextParts` (contributing node
//! identifier -> bucket -> text) and `__fulltext` (bucket -> text). The
//! aggregate is always re-derived from the parts; it is never written on
//! its own.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::document::{FULLTEXT_FIELD, FULLTEXT_PARTS_FIELD};
use crate::error::CoreError;

/// Bucket key (e.g. `h1`, `text`) -> text.
pub type FulltextBuckets = BTreeMap<String, String>;

/// Contributing node identifier -> buckets.
pub type FulltextParts = BTreeMap<String, FulltextBuckets>;

/// Upsert or remove one node's contribution.
///
/// An empty contribution removes the node's entry.
pub fn apply_contribution(parts: &mut FulltextParts, identifier: &str, contribution: &FulltextBuckets) {
    if contribution.is_empty() {
        parts.remove(identifier);
    } else {
        parts.insert(identifier.to_string(), contribution.clone());
    }
}

/// Derive the aggregate: per bucket, the space-joined trimmed texts of all
/// parts, in part order.
pub fn aggregate(parts: &FulltextParts) -> FulltextBuckets {
    let mut fulltext = FulltextBuckets::new();
    for buckets in parts.values() {
        for (bucket, content) in buckets {
            let content = content.trim();
            match fulltext.entry(bucket.clone()) {
                Entry::Occupied(mut existing) => {
                    let value = existing.get_mut();
                    value.push(' ');
                    value.push_str(content);
                }
                Entry::Vacant(slot) => {
                    slot.insert(content.to_string());
                }
            }
        }
    }
    fulltext
}

/// Read the parts map stored in a document source.
///
/// A missing field yields empty parts.
pub fn parts_from_source(source: &Map<String, Value>) -> Result<FulltextParts, CoreError> {
    match source.get(FULLTEXT_PARTS_FIELD) {
        None | Some(Value::Null) => Ok(FulltextParts::new()),
        Some(value) => Ok(serde_json::from_value(value.clone())?),
    }
}

/// Read-merge-write on a document source: apply the contribution to the
/// stored parts and recompute the aggregate.
pub fn merge_into_source(
    source: &mut Map<String, Value>,
    identifier: &str,
    contribution: &FulltextBuckets,
) -> Result<(), CoreError> {
    let mut parts = parts_from_source(source)?;
    apply_contribution(&mut parts, identifier, contribution);
    let fulltext = aggregate(&parts);
    source.insert(FULLTEXT_PARTS_FIELD.to_string(), serde_json::to_value(&parts)?);
    source.insert(FULLTEXT_FIELD.to_string(), serde_json::to_value(&fulltext)?);
    Ok(())
}

/// Fields a not-yet-existing root document is created with.
pub fn initial_source(
    identifier: &str,
    contribution: &FulltextBuckets,
) -> Result<Map<String, Value>, CoreError> {
    let mut source = Map::new();
    merge_into_source(&mut source, identifier, contribution)?;
    Ok(source)
}
