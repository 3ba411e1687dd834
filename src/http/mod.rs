//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware layers)
//!     → request.rs (request ID)
//!     → dispatch.rs (snapshot → route → auth → response)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod request;
pub mod server;

pub use dispatch::{Outcome, Reply, RequestContext};
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
