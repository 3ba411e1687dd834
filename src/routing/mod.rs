//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming path remainder (base stripped, no leading slash)
//!     → router.rs (static exact lookup, lower-cased)
//!     → matcher.rs (templated routes, declaration order)
//!     → Return: matched Route + PathArgs, or NoMatch
//!
//! Route Compilation (at load):
//!     document paths (IndexMap, declaration order kept)
//!     → compile templates, parse methods/status/headers
//!     → Freeze as immutable RouteTable inside the Snapshot
//! ```
//!
//! # Design Decisions
//! - Routes compiled at load, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Static routes always win over templated ones
//! - First templated match wins (declaration order)

use std::collections::HashMap;

pub mod matcher;
pub mod router;

pub use matcher::{PathTemplate, TemplateError};
pub use router::{Response, Route, RouteMatch, RouteTable};

/// Argument name to the request segment bound to it.
pub type PathArgs = HashMap<String, String>;
