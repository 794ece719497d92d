//! Type mappings for the backend, one per node type.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::info;

use crsearch_client::SearchBackend;
use crsearch_types::document::{
    DIMENSION_COMBINATION_HASH_FIELD, FULLTEXT_FIELD, FULLTEXT_PARTS_FIELD, IDENTIFIER_FIELD,
    PATH_FIELD, WORKSPACE_FIELD,
};
use crsearch_types::{mapping_name_for, IndexHandle, NodeTypeSchema, Settings, UNSTRUCTURED_NODE_TYPE};

use crate::error::IndexingError;

/// Mapping of one backend type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMapping {
    /// Backend type name (see [`mapping_name_for`])
    pub type_name: String,
    /// Node type the mapping was derived from
    pub node_type: String,
    pub properties: Map<String, Value>,
}

impl TypeMapping {
    /// Request body for a put-mapping call.
    pub fn body(&self) -> Value {
        json!({ "properties": self.properties })
    }

    /// Body keyed by type name, as shown to operators.
    pub fn as_value(&self) -> Value {
        let mut keyed = Map::new();
        keyed.insert(self.type_name.clone(), self.body());
        Value::Object(keyed)
    }
}

/// Mappings plus the problems found while building them.
#[derive(Debug, Clone, Default)]
pub struct MappingCollection {
    pub mappings: Vec<TypeMapping>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl MappingCollection {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Produces the type mappings for an index.
#[async_trait]
pub trait MappingBuilder: Send + Sync {
    fn build(&self, index: &IndexHandle) -> MappingCollection;

    /// Put one mapping into the index.
    async fn apply(
        &self,
        backend: &dyn SearchBackend,
        index: &IndexHandle,
        mapping: &TypeMapping,
    ) -> Result<(), IndexingError> {
        backend
            .put_mapping(&index.name, &mapping.type_name, &mapping.body())
            .await?;
        info!(index = %index.name, type_name = %mapping.type_name, "Applied mapping");
        Ok(())
    }
}

/// Builds mappings from the node type schema registry.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredMappingBuilder {
    node_types: BTreeMap<String, NodeTypeSchema>,
}

impl ConfiguredMappingBuilder {
    pub fn new(node_types: BTreeMap<String, NodeTypeSchema>) -> Self {
        Self { node_types }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.node_types.clone())
    }
}

/// Fields every document carries.
fn derived_field_mappings() -> Map<String, Value> {
    let mut properties = Map::new();
    for field in [
        WORKSPACE_FIELD,
        DIMENSION_COMBINATION_HASH_FIELD,
        IDENTIFIER_FIELD,
        PATH_FIELD,
    ] {
        properties.insert(field.to_string(), json!({ "type": "keyword" }));
    }
    properties.insert(FULLTEXT_FIELD.to_string(), json!({ "type": "object" }));
    properties.insert(
        FULLTEXT_PARTS_FIELD.to_string(),
        json!({ "type": "object", "enabled": false }),
    );
    properties
}

impl MappingBuilder for ConfiguredMappingBuilder {
    fn build(&self, _index: &IndexHandle) -> MappingCollection {
        let mut collection = MappingCollection::default();

        for (node_type, schema) in &self.node_types {
            if node_type == UNSTRUCTURED_NODE_TYPE {
                continue;
            }

            let mut properties = derived_field_mappings();
            for (name, property) in &schema.properties {
                if !property.indexed {
                    if property.mapping.is_some() {
                        collection.warnings.push(format!(
                            "{}: property \"{}\" is not indexed, its mapping is ignored",
                            node_type, name
                        ));
                    }
                    continue;
                }
                match &property.mapping {
                    Some(Value::Object(mapping)) => {
                        properties.insert(name.clone(), Value::Object(mapping.clone()));
                    }
                    Some(other) => collection.errors.push(format!(
                        "{}: mapping of property \"{}\" must be an object, got {}",
                        node_type, name, other
                    )),
                    None => {}
                }
            }

            collection.mappings.push(TypeMapping {
                type_name: mapping_name_for(node_type),
                node_type: node_type.clone(),
                properties,
            });
        }

        collection
    }
}
