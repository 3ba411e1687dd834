//! Entity schemas built from the declarative field and index lists.
//!
//! # Responsibilities
//! - Resolve type names to [`DataType`]s
//! - Resolve index definitions to field positions
//! - Turn loosely-typed seed rows into [`Record`]s
//!
//! # Design Decisions
//! - Entity, field and index names are lower-cased once here; every later
//!   lookup is case-insensitive by construction
//! - Wire names are the title-cased field names, computed once

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::{Map, Value as Json};

use crate::config::schema::EntityConfig;
use crate::store::value::{DataType, Value};
use crate::store::StoreError;

/// A declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Lower-cased name.
    pub name: String,
    /// Name used when serializing records.
    pub wire_name: String,
    pub data_type: DataType,
}

/// A resolved index definition.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    /// Lower-cased name.
    pub name: String,
    /// Positions of the indexed fields, leading component first.
    pub fields: Vec<usize>,
    pub unique: bool,
}

/// A typed row, values in schema field order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }
}

/// The runtime shape of one entity.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: String,
    fields: Vec<FieldDef>,
    positions: HashMap<String, usize>,
    indexes: Vec<IndexDef>,
}

impl EntitySchema {
    /// Build from a declared entity. Fails on unknown type names, indexes
    /// referring to undeclared fields, and duplicate index names.
    pub fn build(name: &str, config: &EntityConfig) -> Result<Self, StoreError> {
        let name = name.to_lowercase();
        let mut fields = Vec::with_capacity(config.fields.len());
        let mut positions = HashMap::new();

        for (field, type_name) in &config.fields {
            let data_type = type_name.parse().map_err(|ty| StoreError::UnknownType {
                entity: name.clone(),
                field: field.clone(),
                ty,
            })?;
            let lowered = field.to_lowercase();
            positions.insert(lowered.clone(), fields.len());
            fields.push(FieldDef {
                wire_name: title_case(&lowered),
                name: lowered,
                data_type,
            });
        }

        let mut indexes: Vec<IndexDef> = Vec::with_capacity(config.indexes.len());
        for index in &config.indexes {
            let index_name = index.name.to_lowercase();
            if indexes.iter().any(|i| i.name == index_name) {
                return Err(StoreError::DuplicateIndex {
                    entity: name.clone(),
                    index: index_name,
                });
            }
            let targets = index
                .target_fields()
                .into_iter()
                .map(|field| {
                    positions
                        .get(&field.to_lowercase())
                        .copied()
                        .ok_or_else(|| StoreError::UnknownIndexField {
                            entity: name.clone(),
                            index: index.name.clone(),
                            field: field.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            indexes.push(IndexDef {
                name: index_name,
                fields: targets,
                unique: index.unique,
            });
        }

        Ok(Self {
            name,
            fields,
            positions,
            indexes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.positions.get(&field.to_lowercase()).copied()
    }

    /// The index used when a query names none: `id` if declared, else the
    /// first declared index.
    pub fn primary_index(&self) -> Option<&IndexDef> {
        self.indexes
            .iter()
            .find(|i| i.name == "id")
            .or_else(|| self.indexes.first())
    }

    /// Coerce a seed row. Omitted fields take their type's zero value;
    /// undeclared fields and incompatible values are errors.
    pub fn record(&self, row: &Map<String, Json>) -> Result<Record, StoreError> {
        let mut values: Vec<Option<Value>> = vec![None; self.fields.len()];
        for (key, raw) in row {
            let position = self.position(key).ok_or_else(|| StoreError::UnknownField {
                entity: self.name.clone(),
                field: key.clone(),
            })?;
            let field = &self.fields[position];
            let value = field
                .data_type
                .coerce(raw)
                .map_err(|e| StoreError::Coercion {
                    entity: self.name.clone(),
                    field: field.name.clone(),
                    expected: e.expected,
                    found: e.found,
                })?;
            values[position] = Some(value);
        }
        let values = values
            .into_iter()
            .zip(&self.fields)
            .map(|(value, field)| value.unwrap_or_else(|| field.data_type.zero()))
            .collect();
        Ok(Record { values })
    }

    /// Serialize a record with title-cased keys in schema order.
    pub fn to_json(&self, record: &Record) -> Json {
        let object: Map<String, Json> = self
            .fields
            .iter()
            .zip(record.values())
            .map(|(field, value)| (field.wire_name.clone(), value.to_json()))
            .collect();
        Json::Object(object)
    }
}

/// Build every declared entity, keyed by lower-cased name.
pub fn build_schemas(
    entities: &IndexMap<String, EntityConfig>,
) -> Result<IndexMap<String, EntitySchema>, StoreError> {
    entities
        .iter()
        .map(|(name, config)| {
            let schema = EntitySchema::build(name, config)?;
            Ok((schema.name.clone(), schema))
        })
        .collect()
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
