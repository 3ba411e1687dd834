//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once, at startup
//! - Take the log level from `RUST_LOG`, with a sensible default
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Audit lines share the subscriber under their own target so they can be
//!   filtered separately (`RUST_LOG=declarest::audit=info`)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "declarest=info,tower_http=info";

/// Install the global subscriber. Call once.
pub fn init() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
