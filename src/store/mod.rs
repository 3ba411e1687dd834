//! In-memory store subsystem.
//!
//! # Data Flow
//! ```text
//! storage.entities (field/type maps, index lists)
//!     → schema.rs (EntitySchema per entity, names lower-cased)
//!     → LoadTxn (seed rows coerced into Records, indexed)
//!     → commit → Store (immutable)
//!
//! Per request:
//!     query.rs (filter fields + path arguments → typed key)
//!     → table.rs / index.rs (prefix lookup or lower-bound scan, index order)
//!     → JSON array of records
//! ```
//!
//! # Design Decisions
//! - Load is all-or-nothing: any error drops the transaction, nothing is
//!   ever published half-built
//! - The store is never mutated after commit; a reload builds a new one
//! - Query-time problems are `StoreError`s for the caller to report, never
//!   panics

pub mod index;
pub mod query;
pub mod schema;
pub mod table;
pub mod value;

use indexmap::IndexMap;
use serde_json::{Map, Value as Json};
use thiserror::Error;

use crate::config::schema::StorageConfig;
use crate::store::schema::{build_schemas, EntitySchema};
use crate::store::table::Table;
use crate::store::value::DataType;

pub use query::execute;

/// Errors raised while building, loading or querying the store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("unknown type `{ty}` for field {entity}.{field}")]
    UnknownType { entity: String, field: String, ty: String },

    #[error("unknown index field: {entity}.{index} refers to `{field}`")]
    UnknownIndexField { entity: String, index: String, field: String },

    #[error("duplicate index: {entity}.{index}")]
    DuplicateIndex { entity: String, index: String },

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("unknown index: {entity}.{index}")]
    UnknownIndex { entity: String, index: String },

    #[error("unknown field: {entity}.{field}")]
    UnknownField { entity: String, field: String },

    #[error("invalid value for {entity}.{field}: expected {expected}, found {found}")]
    Coercion {
        entity: String,
        field: String,
        expected: DataType,
        found: String,
    },

    #[error("unique index {entity}.{index} already holds key ({key})")]
    UniqueViolation { entity: String, index: String, key: String },

    #[error("index {entity}.{index} has {expected} field(s), got {found} value(s)")]
    TooManyValues {
        entity: String,
        index: String,
        expected: usize,
        found: usize,
    },
}

/// A write transaction over a fresh set of tables.
///
/// Dropping it without [`LoadTxn::commit`] discards everything inserted.
#[derive(Debug)]
pub struct LoadTxn {
    tables: IndexMap<String, Table>,
}

impl LoadTxn {
    pub fn new(schemas: IndexMap<String, EntitySchema>) -> Self {
        let tables = schemas
            .into_iter()
            .map(|(name, schema)| (name, Table::new(schema)))
            .collect();
        Self { tables }
    }

    /// Coerce and insert one seed row into `entity`.
    pub fn insert(&mut self, entity: &str, row: &Map<String, Json>) -> Result<(), StoreError> {
        let table = self
            .tables
            .get_mut(&entity.to_lowercase())
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))?;
        let record = table.schema().record(row)?;
        table.insert(record)?;
        Ok(())
    }

    pub fn commit(self) -> Store {
        Store {
            tables: self.tables,
        }
    }
}

/// An immutable, fully loaded store.
#[derive(Debug, Clone, Default)]
pub struct Store {
    tables: IndexMap<String, Table>,
}

impl Store {
    /// Build the schema and load every seed row in one transaction.
    pub fn build(config: &StorageConfig) -> Result<Self, StoreError> {
        let schemas = build_schemas(&config.entities)?;
        let mut txn = LoadTxn::new(schemas);
        for (entity, rows) in &config.data {
            for row in rows {
                txn.insert(entity, row)?;
            }
        }
        let store = txn.commit();

        tracing::debug!(
            entities = store.tables.len(),
            rows = store.tables.values().map(Table::len).sum::<usize>(),
            "Store loaded"
        );
        Ok(store)
    }

    pub fn table(&self, entity: &str) -> Result<&Table, StoreError> {
        self.tables
            .get(&entity.to_lowercase())
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::Record;
    use crate::store::value::Value;
    use serde_json::json;

    fn storage(value: Json) -> StorageConfig {
        serde_json::from_value(value).unwrap()
    }

    fn people() -> Json {
        json!({
            "entities": {
                "person": {
                    "fields": {"email": "string", "name": "string", "age": "int"},
                    "indexes": [
                        {"name": "id", "field": "email", "unique": true},
                        {"name": "age"}
                    ]
                }
            },
            "data": {
                "person": [
                    {"email": "joe@aol.com", "name": "Joe", "age": 30},
                    {"email": "lucy@aol.com", "name": "Lucy", "age": 35},
                    {"email": "tariq@aol.com", "name": "Tariq", "age": 21},
                    {"email": "dorothy@aol.com", "name": "Dorothy", "age": 53}
                ]
            }
        })
    }

    /// Point lookup through the primary (or named) index.
    fn get<'a>(store: &'a Store, entity: &str, index: Option<&str>, key: &[Value]) -> Result<Vec<&'a Record>, StoreError> {
        let table = store.table(entity)?;
        table.lookup(table.index(index)?, key)
    }

    #[test]
    fn test_build_and_point_lookup() {
        let store = Store::build(&storage(people())).unwrap();
        let found = get(&store, "Person", None, &[Value::Text("lucy@aol.com".into())]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].values()[1], Value::Text("Lucy".into()));
    }

    #[test]
    fn test_lower_bound_range() {
        let store = Store::build(&storage(people())).unwrap();
        let table = store.table("person").unwrap();
        let age = table.index(Some("AGE")).unwrap().unwrap();
        let names: Vec<_> = table
            .lower_bound(age, &[Value::Integer(25)])
            .unwrap()
            .into_iter()
            .map(|r| r.values()[1].clone())
            .collect();
        assert_eq!(
            names,
            vec![
                Value::Text("Joe".into()),
                Value::Text("Lucy".into()),
                Value::Text("Dorothy".into())
            ]
        );
    }

    #[test]
    fn test_unknown_seed_entity_aborts_load() {
        let mut doc = people();
        doc["data"]["pets"] = json!([{"name": "Rex"}]);
        assert_eq!(
            Store::build(&storage(doc)).unwrap_err(),
            StoreError::UnknownEntity("pets".into())
        );
    }

    #[test]
    fn test_duplicate_unique_key_aborts_load() {
        let mut doc = people();
        doc["data"]["person"]
            .as_array_mut()
            .unwrap()
            .push(json!({"email": "joe@aol.com", "name": "Joseph", "age": 31}));
        let err = Store::build(&storage(doc)).unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { ref index, .. } if index == "id"));
    }

    #[test]
    fn test_incompatible_seed_aborts_load() {
        let mut doc = people();
        doc["data"]["person"][0]["age"] = json!("thirty");
        assert!(matches!(
            Store::build(&storage(doc)),
            Err(StoreError::Coercion { .. })
        ));
    }

    #[test]
    fn test_unknown_entity_and_index_at_query_time() {
        let store = Store::build(&storage(people())).unwrap();
        assert!(matches!(get(&store, "pets", None, &[]), Err(StoreError::UnknownEntity(_))));
        assert!(matches!(
            get(&store, "person", Some("by_phone"), &[]),
            Err(StoreError::UnknownIndex { .. })
        ));
        assert!(matches!(
            get(&store, "person", Some("age"), &[Value::Integer(1), Value::Integer(2)]),
            Err(StoreError::TooManyValues { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn test_entity_without_indexes_scans_in_insertion_order() {
        let store = Store::build(&storage(json!({
            "entities": {"note": {"fields": {"text": "string"}}},
            "data": {"note": [{"text": "b"}, {"text": "a"}]}
        })))
        .unwrap();
        let all = get(&store, "note", None, &[]).unwrap();
        assert_eq!(all[0].values()[0], Value::Text("b".into()));
        assert!(get(&store, "note", None, &[Value::Text("a".into())]).is_err());
    }
}
