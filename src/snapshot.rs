//! The live, fully built configuration.
//!
//! # Responsibilities
//! - Turn a parsed document into an immutable [`Snapshot`]: validated
//!   routes, loaded store, normalized base path
//! - Publish snapshots atomically through a [`SnapshotHandle`]
//!
//! # Design Decisions
//! - A snapshot is never mutated; reload builds and swaps in a new one
//! - Each request loads the pointer once and keeps that snapshot to the end
//! - Old snapshots are freed when the last request holding them finishes

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::config::loader::ConfigError;
use crate::config::schema::{AuthConfig, Document, TlsConfig};
use crate::config::validation::validate_document;
use crate::routing::RouteTable;
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub host: String,
    pub port: u16,
    /// Leading slash, no trailing slash; empty for the root.
    pub base: String,
    pub timeout: Duration,
    pub tls: Option<TlsConfig>,
    pub auth: Option<AuthConfig>,
    pub routes: RouteTable,
    pub store: Option<Store>,
    pub metrics: Option<SocketAddr>,
}

impl Snapshot {
    /// Validate `doc` and build everything it declares.
    pub fn build(doc: Document) -> Result<Self, ConfigError> {
        validate_document(&doc).map_err(ConfigError::Validation)?;

        let routes = RouteTable::build(&doc.paths).map_err(|e| ConfigError::Validation(vec![e]))?;
        let store = doc.storage.as_ref().map(Store::build).transpose()?;
        // Checked by validation.
        let metrics = doc.metrics.as_deref().and_then(|addr| addr.parse().ok());

        Ok(Self {
            base: normalize_base(&doc.base),
            host: doc.host,
            port: doc.port,
            timeout: Duration::from_secs(doc.timeout),
            tls: doc.tls,
            auth: doc.auth,
            routes,
            store,
            metrics,
        })
    }

    /// The part of `path` under the base, without its leading slash.
    pub fn strip_base<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.base.as_str())?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }

    /// Bind address as `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings that only take effect on restart and differ from `other`.
    pub fn listener_changes(&self, other: &Snapshot) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.host != other.host {
            changed.push("host");
        }
        if self.port != other.port {
            changed.push("port");
        }
        if self.tls != other.tls {
            changed.push("tls");
        }
        if self.metrics != other.metrics {
            changed.push("metrics");
        }
        changed
    }
}

fn normalize_base(base: &str) -> String {
    let trimmed = base.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Shared pointer to the live snapshot.
#[derive(Clone)]
pub struct SnapshotHandle {
    inner: Arc<ArcSwap<Snapshot>>,
}

impl SnapshotHandle {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(snapshot)),
        }
    }

    /// The snapshot live right now.
    pub fn load(&self) -> Arc<Snapshot> {
        self.inner.load_full()
    }

    /// Make `snapshot` live; returns the one it replaced.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        self.inner.swap(Arc::new(snapshot))
    }
}
