//! Command-line interface.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::EXAMPLE_DOCUMENT;

/// File written by `--example`.
pub const EXAMPLE_FILE: &str = "example.yaml";

#[derive(Debug, Parser)]
#[command(name = "declarest", version)]
#[command(about = "Serve HTTP responses declared in a YAML, JSON or TOML document", long_about = None)]
pub struct Cli {
    /// Document to serve; `.yaml`, `.yml`, `.json` and `.toml` are tried
    /// when the name has no extension
    #[arg(default_value = "source")]
    pub filename: PathBuf,

    /// Write an example document to example.yaml and exit
    #[arg(short, long)]
    pub example: bool,
}

/// Write the bundled example document into `dir`.
pub fn write_example(dir: &Path) -> std::io::Result<PathBuf> {
    let path = dir.join(EXAMPLE_FILE);
    fs::write(&path, EXAMPLE_DOCUMENT)?;
    Ok(path)
}
