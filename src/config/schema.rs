//! Document schema definitions.
//!
//! This module defines the complete structure of a served document.
//! All types derive Serde traits for deserialization from JSON, YAML or TOML.
//! Maps use `IndexMap` so declaration order survives parsing: templated
//! paths are scanned in that order and entity fields serialize in it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::auth::Claims;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_BASE: &str = "/";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Root of a served document.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Document {
    /// Interface to bind (e.g., "127.0.0.1").
    pub host: String,

    /// Prefix every served path lives under.
    pub base: String,

    /// Port to bind.
    pub port: u16,

    /// Per-request deadline in seconds.
    pub timeout: u64,

    /// Optional TLS configuration for the listener.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,

    /// Server-wide authentication, evaluated before path and method levels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// Served paths, in declaration order.
    pub paths: IndexMap<String, PathConfig>,

    /// Optional in-memory store backing query responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    /// Prometheus exporter bind address (e.g., "127.0.0.1:9090").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            base: DEFAULT_BASE.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT_SECS,
            tls: None,
            auth: None,
            paths: IndexMap::new(),
            storage: None,
            metrics: None,
        }
    }
}

impl Document {
    /// Replace zero values with their defaults.
    ///
    /// A document may spell out `port: 0` or `host: ""`; those mean "unset".
    pub fn apply_defaults(&mut self) {
        if self.host.is_empty() {
            self.host = DEFAULT_HOST.to_string();
        }
        if self.base.is_empty() {
            self.base = DEFAULT_BASE.to_string();
        }
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        if self.timeout == 0 {
            self.timeout = DEFAULT_TIMEOUT_SECS;
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    #[serde(rename = "certFile", alias = "cert_file")]
    pub cert_file: String,

    /// Path to private key file (PEM).
    #[serde(rename = "keyFile", alias = "key_file")]
    pub key_file: String,
}

/// Authentication requirement for one level of the chain.
///
/// Present with neither field set is a meaningful state: the level passes
/// without any verification.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Claims a bearer token must carry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer: Option<Claims>,

    /// Claims basic credentials must carry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Claims>,
}

/// A served path.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PathConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// HTTP method name to response.
    pub methods: IndexMap<String, ResponseConfig>,
}

/// The response configured for one method of a path.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// Status to emit; 0 means 200.
    #[serde(alias = "status")]
    pub status_code: u16,

    /// Literal body. Non-string values are served as compact JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,

    /// Headers applied verbatim.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,

    /// Store query backing the body.
    #[serde(alias = "select", skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryConfig>,
}

/// A store query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Informational only; every query is a read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    pub entity: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterConfig>,

    /// Parsed but not enforced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Parsed but not enforced.
    #[serde(rename = "pageSize", alias = "page_size", skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// Index lookup for a query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Index to look up; the primary index when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    /// Key values, in index field order. A field naming a path argument
    /// (`id` or `{id}`) takes that argument's value; anything else is literal.
    pub fields: Vec<String>,

    pub mode: FilterMode,
}

/// How filter values select rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterMode {
    /// Rows whose key equals (or, with fewer values, starts with) the values.
    #[default]
    Exact,
    /// Every row from the first key at or after the values onwards.
    #[serde(alias = "lowerbound", alias = "lower_bound")]
    LowerBound,
}

/// In-memory store: schema plus seed data.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub entities: IndexMap<String, EntityConfig>,

    /// Entity name to seed rows.
    pub data: IndexMap<String, Vec<serde_json::Map<String, serde_json::Value>>>,
}

/// Declared record shape.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EntityConfig {
    /// Field name to type name (`string`, `int`, `bool`, `float`, `timestamp`).
    pub fields: IndexMap<String, String>,

    pub indexes: Vec<IndexConfig>,
}

/// Declared index.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    pub name: String,

    /// Single indexed field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Ordered indexed fields, used when `field` is absent.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,

    pub unique: bool,
}

impl IndexConfig {
    /// Indexed field names: `field`, else `fields`, else the index's own name.
    pub fn target_fields(&self) -> Vec<&str> {
        if let Some(field) = &self.field {
            vec![field.as_str()]
        } else if !self.fields.is_empty() {
            self.fields.iter().map(String::as_str).collect()
        } else {
            vec![self.name.as_str()]
        }
    }
}
