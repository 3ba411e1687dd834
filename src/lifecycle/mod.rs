//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Resolve document → Load → Build snapshot → Metrics → Watcher → Listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server drains, watcher stops → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: document first, then watcher, then listener
//! - Any startup error is fatal; reload errors never are

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, StartupError};
