//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve, load and build the document
//! - Initialize metrics and the config watcher
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener starts last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::auth::HeaderAuthorizer;
use crate::config::{load_document, resolve_path, ConfigError, ConfigWatcher};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::snapshot::{Snapshot, SnapshotHandle};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to watch document: {0}")]
    Watch(#[from] notify::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Serve the document named `name` until SIGINT/SIGTERM.
pub async fn start(name: &Path) -> Result<(), StartupError> {
    // 1. Document
    let path = resolve_path(name)?;
    let snapshot = Snapshot::build(load_document(&path)?)?;
    tracing::info!(
        path = ?path,
        base = %snapshot.base,
        timeout = ?snapshot.timeout,
        storage = snapshot.store.is_some(),
        "Document loaded"
    );
    for route in snapshot.routes.describe() {
        tracing::info!(route = %route, "Serving");
    }

    // 2. Metrics
    if let Some(addr) = snapshot.metrics {
        metrics::init_metrics(addr);
    }

    let address = snapshot.address();
    let tls = snapshot.tls.clone();
    let handle = SnapshotHandle::new(snapshot);
    let shutdown = Shutdown::new();

    // 3. Watcher
    let watcher = ConfigWatcher::new(&path, handle.clone()).spawn(shutdown.subscribe())?;

    // 4. Listener
    let server = HttpServer::new(handle, Arc::new(HeaderAuthorizer::default()));
    shutdown.trigger_on(signals::terminate());
    let served = match tls {
        Some(tls) => {
            let addr = resolve_addr(&address).await?;
            server.run_tls(addr, &tls, shutdown.subscribe()).await
        }
        None => {
            let listener = TcpListener::bind(&address)
                .await
                .map_err(|source| StartupError::Bind {
                    address: address.clone(),
                    source,
                })?;
            server.run(listener, shutdown.subscribe()).await
        }
    };

    // The server may also stop on its own error; stop the watcher either way.
    shutdown.trigger();
    let _ = watcher.await;
    served.map_err(StartupError::Serve)
}

async fn resolve_addr(address: &str) -> Result<SocketAddr, StartupError> {
    let bind_error = |source| StartupError::Bind {
        address: address.to_string(),
        source,
    };
    tokio::net::lookup_host(address)
        .await
        .map_err(bind_error)?
        .next()
        .ok_or_else(|| {
            bind_error(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "host resolved to no address",
            ))
        })
}
