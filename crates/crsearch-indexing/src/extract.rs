//! Property and fulltext extraction.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crsearch_types::{ContentNode, FulltextBuckets, NodeTypeSchema, Settings};

/// Indexable fields and bucketed fulltext of one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub fields: Map<String, Value>,
    pub fulltext: FulltextBuckets,
}

/// Turns a node's property bag into indexable fields.
pub trait PropertyExtractor: Send + Sync {
    /// Extract fields and fulltext; `on_skipped` is called once per
    /// property that has no configuration.
    fn extract(&self, node: &ContentNode, on_skipped: &mut dyn FnMut(&str)) -> Extraction;
}

/// Extractor driven by the node type schema registry.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredExtractor {
    node_types: BTreeMap<String, NodeTypeSchema>,
}

impl ConfiguredExtractor {
    pub fn new(node_types: BTreeMap<String, NodeTypeSchema>) -> Self {
        Self { node_types }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.node_types.clone())
    }
}

/// Text form of a property value, if it has one.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(text_of).collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        _ => None,
    }
}

impl PropertyExtractor for ConfiguredExtractor {
    fn extract(&self, node: &ContentNode, on_skipped: &mut dyn FnMut(&str)) -> Extraction {
        let mut extraction = Extraction::default();
        let schema = self.node_types.get(&node.node_type.name);

        for (name, value) in &node.properties {
            let Some(property) = schema.and_then(|schema| schema.properties.get(name)) else {
                on_skipped(name);
                continue;
            };

            if property.indexed {
                extraction.fields.insert(name.clone(), value.clone());
            }

            if let Some(bucket) = &property.fulltext_bucket {
                let Some(text) = text_of(value) else { continue };
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                extraction
                    .fulltext
                    .entry(bucket.clone())
                    .and_modify(|existing| {
                        existing.push(' ');
                        existing.push_str(text);
                    })
                    .or_insert_with(|| text.to_string());
            }
        }

        extraction
    }
}
