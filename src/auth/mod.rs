//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Request headers
//!     → resolver.rs (server → path → method chain, shared AuthState)
//!     → provider.rs (Authorizer: bearer or credentials check)
//!         → jwks.rs  (issuer discovery, key-set cache, signature check)
//!         → basic.rs (Basic credential decoding)
//!     → claims.rs (expected claims vs. actual claims)
//!     → authorized, or 401
//! ```
//!
//! # Design Decisions
//! - Authorization cascades: once an outer level succeeds, inner levels are
//!   not evaluated at all
//! - A level that declares bearer never falls back to credentials
//! - Verification sits behind the `Authorizer` trait so the dispatcher can
//!   be driven by a stub in tests

pub mod basic;
pub mod claims;
pub mod jwks;
pub mod provider;
pub mod resolver;

use thiserror::Error;

pub use claims::{satisfies, Claims};
pub use jwks::JwksCache;
pub use provider::{Authorizer, HeaderAuthorizer};
pub use resolver::{AuthState, Unauthorized};

/// Why a bearer or credentials check failed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("expected {0} authorization scheme")]
    Scheme(&'static str),

    #[error("malformed credentials: {0}")]
    Credentials(String),

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token has no issuer")]
    MissingIssuer,

    #[error("no usable key for kid {kid:?} from {issuer}")]
    UnknownKey { issuer: String, kid: Option<String> },

    #[error("key discovery failed for {issuer}: {reason}")]
    Discovery { issuer: String, reason: String },

    #[error("token rejected: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("claims do not satisfy requirement")]
    ClaimsMismatch,
}
