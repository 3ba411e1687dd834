//! A table: the rows of one entity plus their indexes.

use indexmap::IndexMap;

use crate::store::index::{Index, RowId};
use crate::store::schema::{EntitySchema, IndexDef, Record};
use crate::store::value::Value;
use crate::store::StoreError;

#[derive(Debug, Clone)]
pub struct Table {
    schema: EntitySchema,
    rows: Vec<Record>,
    indexes: IndexMap<String, Index>,
}

impl Table {
    pub fn new(schema: EntitySchema) -> Self {
        let indexes = schema
            .indexes()
            .iter()
            .map(|def| (def.name.clone(), Index::new(def.clone())))
            .collect();
        Self {
            schema,
            rows: Vec::new(),
            indexes,
        }
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a row into the table and every index.
    ///
    /// Unique indexes are checked before anything is written, so a rejected
    /// row leaves no trace.
    pub fn insert(&mut self, record: Record) -> Result<RowId, StoreError> {
        for index in self.indexes.values().filter(|i| i.def().unique) {
            let key = index.key_of(&record);
            if index.lookup(&key).next().is_some() {
                return Err(self.unique_violation(index.def(), &key));
            }
        }

        let row = self.rows.len();
        for index in self.indexes.values_mut() {
            // Uniqueness was checked above.
            let _ = index.insert(&record, row);
        }
        self.rows.push(record);
        Ok(row)
    }

    /// Resolve an index by name (case-insensitive), or the primary index.
    pub fn index(&self, name: Option<&str>) -> Result<Option<&Index>, StoreError> {
        match name {
            Some(name) => {
                let lowered = name.to_lowercase();
                self.indexes
                    .get(&lowered)
                    .map(Some)
                    .ok_or_else(|| StoreError::UnknownIndex {
                        entity: self.schema.name().to_string(),
                        index: lowered,
                    })
            }
            None => Ok(self
                .schema
                .primary_index()
                .and_then(|def| self.indexes.get(&def.name))),
        }
    }

    /// Rows whose key under `index` starts with `prefix`, in index order.
    ///
    /// Without any index the table can only be scanned whole, in insertion
    /// order.
    pub fn lookup(&self, index: Option<&Index>, prefix: &[Value]) -> Result<Vec<&Record>, StoreError> {
        match index {
            Some(index) => {
                self.check_arity(index.def(), prefix)?;
                Ok(index.lookup(prefix).map(|row| &self.rows[row]).collect())
            }
            None if prefix.is_empty() => Ok(self.rows.iter().collect()),
            None => Err(StoreError::UnknownIndex {
                entity: self.schema.name().to_string(),
                index: "id".to_string(),
            }),
        }
    }

    /// Rows whose key under `index` is at or after `lower`, in index order.
    pub fn lower_bound(&self, index: &Index, lower: &[Value]) -> Result<Vec<&Record>, StoreError> {
        self.check_arity(index.def(), lower)?;
        Ok(index.lower_bound(lower).map(|row| &self.rows[row]).collect())
    }

    fn check_arity(&self, def: &IndexDef, values: &[Value]) -> Result<(), StoreError> {
        if values.len() > def.fields.len() {
            return Err(StoreError::TooManyValues {
                entity: self.schema.name().to_string(),
                index: def.name.clone(),
                expected: def.fields.len(),
                found: values.len(),
            });
        }
        Ok(())
    }

    fn unique_violation(&self, def: &IndexDef, key: &[Value]) -> StoreError {
        let key = key.iter().map(Value::to_string).collect::<Vec<_>>().join(", ");
        StoreError::UniqueViolation {
            entity: self.schema.name().to_string(),
            index: def.name.clone(),
            key,
        }
    }
}
