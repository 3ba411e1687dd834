//! Declarative HTTP response server library.

pub mod auth;
pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod snapshot;
pub mod store;

pub use config::Document;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use snapshot::{Snapshot, SnapshotHandle};
