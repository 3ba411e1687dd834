//! declarest: a declarative HTTP response server.
//!
//! # Architecture Overview
//!
//! ```text
//!     document file ──▶ config (load, validate) ──▶ Snapshot ◀── watcher (hot reload)
//!                                                      │
//!     Client Request                                   ▼
//!     ──────────────▶ http server ──▶ dispatch ──▶ routing ──▶ auth ──▶ content | store query
//!     ◀────────────── response + audit line
//! ```

use std::process::ExitCode;

use clap::Parser;

use declarest::cli::{write_example, Cli};
use declarest::lifecycle;
use declarest::observability::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.example {
        return match write_example(std::path::Path::new(".")) {
            Ok(path) => {
                println!("See {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("unable to write example: {e}");
                ExitCode::FAILURE
            }
        };
    }

    logging::init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "declarest starting");

    match lifecycle::start(&cli.filename).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
