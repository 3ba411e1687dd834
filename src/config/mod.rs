//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! document file (YAML/JSON/TOML)
//!     → loader.rs (resolve name, parse & deserialize, apply defaults)
//!     → validation.rs (semantic checks, all errors collected)
//!     → Snapshot::build (routes, store)
//!     → shared via SnapshotHandle to all requests
//!
//! On change:
//!     watcher.rs detects write / rename / remove
//!     → loader.rs loads new document
//!     → Snapshot::build validates and builds
//!     → atomic swap of Arc<Snapshot>
//!     → new requests observe new snapshot
//! ```
//!
//! # Design Decisions
//! - Snapshot is immutable once built; changes require full reload
//! - All fields have defaults to allow minimal documents
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_document, resolve_path, ConfigError};
pub use schema::Document;
pub use watcher::ConfigWatcher;

/// Example document written by `--example`.
pub const EXAMPLE_DOCUMENT: &str = include_str!("example.yaml");
