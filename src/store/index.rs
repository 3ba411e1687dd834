//! Ordered secondary indexes.
//!
//! Maps a composite key (the indexed field values, leading field first) to
//! row ids. Keys compare lexicographically, so every key sharing a prefix is
//! contiguous and a prefix lookup is a single range scan.

use std::collections::BTreeMap;

use crate::store::schema::{IndexDef, Record};
use crate::store::value::Value;

pub type RowId = usize;

/// Returned when a unique index already holds the key.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateKey(pub Vec<Value>);

/// One index over a table.
#[derive(Debug, Clone)]
pub struct Index {
    def: IndexDef,
    entries: BTreeMap<Vec<Value>, Vec<RowId>>,
}

impl Index {
    pub fn new(def: IndexDef) -> Self {
        Self {
            def,
            entries: BTreeMap::new(),
        }
    }

    pub fn def(&self) -> &IndexDef {
        &self.def
    }

    /// Key of `record` under this index.
    pub fn key_of(&self, record: &Record) -> Vec<Value> {
        self.def
            .fields
            .iter()
            .filter_map(|&position| record.get(position).cloned())
            .collect()
    }

    /// Add a row. Rows sharing a key keep insertion order.
    pub fn insert(&mut self, record: &Record, row: RowId) -> Result<(), DuplicateKey> {
        let key = self.key_of(record);
        if self.def.unique && self.entries.contains_key(&key) {
            return Err(DuplicateKey(key));
        }
        self.entries.entry(key).or_default().push(row);
        Ok(())
    }

    /// Rows whose key starts with `prefix`, in key order.
    ///
    /// A full-length prefix is an exact match; an empty prefix yields every row.
    pub fn lookup<'a>(&'a self, prefix: &'a [Value]) -> impl Iterator<Item = RowId> + 'a {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(move |(key, _)| key.starts_with(prefix))
            .flat_map(|(_, rows)| rows.iter().copied())
    }

    /// Rows whose key is at or after `lower`, in key order.
    pub fn lower_bound<'a>(&'a self, lower: &[Value]) -> impl Iterator<Item = RowId> + 'a {
        self.entries
            .range(lower.to_vec()..)
            .flat_map(|(_, rows)| rows.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{EntityConfig, IndexConfig};
    use crate::store::schema::EntitySchema;
    use serde_json::json;

    fn schema() -> EntitySchema {
        let config = EntityConfig {
            fields: [("last", "string"), ("first", "string"), ("age", "int")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            indexes: vec![
                IndexConfig { name: "name".into(), fields: vec!["last".into(), "first".into()], unique: true, ..Default::default() },
                IndexConfig { name: "age".into(), ..Default::default() },
            ],
        };
        EntitySchema::build("person", &config).unwrap()
    }

    fn rows(schema: &EntitySchema) -> Vec<Record> {
        [
            json!({"last": "Smith", "first": "Joe", "age": 30}),
            json!({"last": "Adams", "first": "Lucy", "age": 35}),
            json!({"last": "Smith", "first": "Ann", "age": 30}),
            json!({"last": "Khan", "first": "Tariq", "age": 21}),
        ]
        .iter()
        .map(|row| schema.record(row.as_object().unwrap()).unwrap())
        .collect()
    }

    #[test]
    fn test_prefix_lookup_on_compound_index() {
        let schema = schema();
        let mut index = Index::new(schema.indexes()[0].clone());
        for (id, record) in rows(&schema).iter().enumerate() {
            index.insert(record, id).unwrap();
        }

        let smiths: Vec<_> = index.lookup(&[Value::Text("Smith".into())]).collect();
        assert_eq!(smiths, vec![2, 0]); // Ann before Joe

        let exact: Vec<_> = index
            .lookup(&[Value::Text("Smith".into()), Value::Text("Joe".into())])
            .collect();
        assert_eq!(exact, vec![0]);

        let none: Vec<_> = index.lookup(&[Value::Text("Jones".into())]).collect();
        assert!(none.is_empty());

        let all: Vec<_> = index.lookup(&[]).collect();
        assert_eq!(all, vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_unique_violation() {
        let schema = schema();
        let records = rows(&schema);
        let mut index = Index::new(schema.indexes()[0].clone());
        index.insert(&records[0], 0).unwrap();
        let err = index.insert(&records[0], 1).unwrap_err();
        assert_eq!(err.0, vec![Value::Text("Smith".into()), Value::Text("Joe".into())]);
        assert_eq!(index.lookup(&[]).count(), 1);
    }

    #[test]
    fn test_non_unique_keeps_insertion_order_and_lower_bound() {
        let schema = schema();
        let mut index = Index::new(schema.indexes()[1].clone());
        for (id, record) in rows(&schema).iter().enumerate() {
            index.insert(record, id).unwrap();
        }
        let thirty: Vec<_> = index.lookup(&[Value::Integer(30)]).collect();
        assert_eq!(thirty, vec![0, 2]);

        let over_25: Vec<_> = index.lower_bound(&[Value::Integer(25)]).collect();
        assert_eq!(over_25, vec![0, 2, 1]);
    }
}
