//! Document loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::Document;
use crate::config::validation::ValidationError;
use crate::store::StoreError;

/// Extensions tried, in order, when the given name does not exist as is.
pub const EXTENSIONS: [&str; 5] = ["", ".yaml", ".yml", ".json", ".toml"];

/// Error type for document loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no document found for `{}` (tried .yaml, .yml, .json, .toml)", .0.display())]
    NotFound(PathBuf),

    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation failed: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Validation(Vec<ValidationError>),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Document syntax, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
    Yaml,
}

impl Format {
    /// `.json` and `.toml` by name; anything else is YAML.
    pub fn of(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Format::Json,
            Some("toml") => Format::Toml,
            _ => Format::Yaml,
        }
    }
}

/// Find the document for `name`: as given, then with each known extension.
pub fn resolve_path(name: &Path) -> Result<PathBuf, ConfigError> {
    EXTENSIONS
        .iter()
        .map(|ext| {
            let mut candidate = name.as_os_str().to_owned();
            candidate.push(ext);
            PathBuf::from(candidate)
        })
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ConfigError::NotFound(name.to_path_buf()))
}

/// Parse document text. Zero values are replaced by defaults.
pub fn parse_document(content: &str, format: Format) -> Result<Document, ConfigError> {
    let mut doc: Document = match format {
        Format::Json => serde_json::from_str(content)?,
        Format::Toml => toml::from_str(content)?,
        // An empty YAML file is a null document.
        Format::Yaml if content.trim().is_empty() => Document::default(),
        Format::Yaml => serde_yaml::from_str(content)?,
    };
    doc.apply_defaults();
    Ok(doc)
}

/// Read and parse the document at `path` (no extension search).
pub fn load_document(path: &Path) -> Result<Document, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&content, Format::of(path))
}
