//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use declarest::auth::{Authorizer, HeaderAuthorizer};
use declarest::config::load_document;
use declarest::http::HttpServer;
use declarest::lifecycle::Shutdown;
use declarest::snapshot::{Snapshot, SnapshotHandle};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// A server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub handle: SnapshotHandle,
    pub shutdown: Shutdown,
    pub document: PathBuf,
    _dir: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Write `content` as `name` in `dir`.
pub fn write_document(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Start a server for `yaml` with the real header authorizer.
pub async fn start_server(yaml: &str) -> TestServer {
    start_server_with(yaml, Arc::new(HeaderAuthorizer::default())).await
}

/// Start a server for `yaml` with a custom authorizer.
pub async fn start_server_with(yaml: &str, authorizer: Arc<dyn Authorizer>) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let document = write_document(dir.path(), "source.yaml", yaml);
    let snapshot = Snapshot::build(load_document(&document).unwrap()).unwrap();
    let handle = SnapshotHandle::new(snapshot);

    let shutdown = Shutdown::new();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(handle.clone(), authorizer);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer {
        addr,
        handle,
        shutdown,
        document,
        _dir: dir,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Holds every bearer check until released; credentials checks pass.
pub struct Gate {
    pub entered: tokio::sync::Notify,
    release: tokio::sync::Semaphore,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Semaphore::new(0),
        }
    }
}

impl Gate {
    /// Let `n` held or future bearer checks through.
    pub fn open(&self, n: usize) {
        self.release.add_permits(n);
    }
}

#[async_trait::async_trait]
impl Authorizer for Gate {
    async fn bearer(
        &self,
        _: &axum::http::HeaderMap,
        _: &declarest::auth::Claims,
    ) -> Result<declarest::auth::Claims, declarest::auth::AuthError> {
        self.entered.notify_one();
        if let Ok(permit) = self.release.acquire().await {
            permit.forget();
        }
        Ok(declarest::auth::Claims::new())
    }

    async fn credentials(
        &self,
        _: &axum::http::HeaderMap,
        _: &declarest::auth::Claims,
    ) -> Result<declarest::auth::Claims, declarest::auth::AuthError> {
        Ok(declarest::auth::Claims::new())
    }
}
