//! Audit trail of served requests.

use std::fmt::Display;

/// Target every audit event is logged under.
pub const AUDIT_TARGET: &str = "declarest::audit";

/// Record the terminal outcome of one request.
pub fn serving(method: &str, path: &str, outcome: impl Display) {
    tracing::info!(
        target: AUDIT_TARGET,
        method = %method,
        path = %path,
        outcome = %outcome,
        "Serving: {}:{} -> {}",
        method,
        path,
        outcome
    );
}
