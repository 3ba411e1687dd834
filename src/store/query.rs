//! Query execution for query-backed responses.

use serde_json::Value as Json;

use crate::config::schema::{FilterMode, QueryConfig};
use crate::routing::PathArgs;
use crate::store::{Store, StoreError};

/// Run a configured query against `store` with the request's path arguments.
///
/// Always yields a JSON array; no match is `[]`, not an error.
pub fn execute(store: &Store, query: &QueryConfig, args: &PathArgs) -> Result<Json, StoreError> {
    let table = store.table(&query.entity)?;
    let (index_name, fields, mode) = match &query.filter {
        Some(filter) => (filter.index.as_deref(), filter.fields.as_slice(), filter.mode),
        None => (None, &[][..], FilterMode::Exact),
    };
    let index = table.index(index_name)?;

    let mut key = Vec::with_capacity(fields.len());
    if let Some(index) = index {
        let def = index.def();
        if fields.len() > def.fields.len() {
            return Err(StoreError::TooManyValues {
                entity: table.schema().name().to_string(),
                index: def.name.clone(),
                expected: def.fields.len(),
                found: fields.len(),
            });
        }
        for (field, &position) in fields.iter().zip(&def.fields) {
            let target = &table.schema().fields()[position];
            let raw = resolve_field(field, args);
            let value = target.data_type.parse(raw).map_err(|e| StoreError::Coercion {
                entity: table.schema().name().to_string(),
                field: target.name.clone(),
                expected: e.expected,
                found: e.found,
            })?;
            key.push(value);
        }
    } else if !fields.is_empty() || mode == FilterMode::LowerBound {
        return Err(StoreError::UnknownIndex {
            entity: table.schema().name().to_string(),
            index: "id".to_string(),
        });
    }

    let rows = match (mode, index) {
        (FilterMode::LowerBound, Some(index)) => table.lower_bound(index, &key)?,
        _ => table.lookup(index, &key)?,
    };
    if query.page.is_some() || query.page_size.is_some() {
        tracing::trace!(entity = %query.entity, "Pagination declared but not applied");
    }

    Ok(Json::Array(
        rows.into_iter().map(|record| table.schema().to_json(record)).collect(),
    ))
}

/// A filter field names a path argument either bare (`id`) or as a
/// placeholder (`{id}`); unbound names are literals.
fn resolve_field<'a>(field: &'a str, args: &'a PathArgs) -> &'a str {
    let name = field
        .strip_prefix('{')
        .and_then(|f| f.strip_suffix('}'))
        .unwrap_or(field);
    args.get(name).map(String::as_str).unwrap_or(field)
}
