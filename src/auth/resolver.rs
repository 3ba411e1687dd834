//! Cascading evaluation of auth levels.
//!
//! A request passes through up to three levels: server, path, method. One
//! [`AuthState`] is threaded through all of them:
//!
//! 1. Already authorized: the level is skipped, whatever it declares. An
//!    outer success satisfies every inner level.
//! 2. `bearer` declared: the bearer check decides; failure is final.
//! 3. `credentials` declared: the credentials check decides; failure is final.
//! 4. Declared with neither: authorized without verification.
//!
//! An absent level leaves the state unchanged.

use axum::http::HeaderMap;
use thiserror::Error;

use crate::auth::{Authorizer, Claims};
use crate::config::schema::AuthConfig;

/// Authentication failed at some level.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unauthorized")]
pub struct Unauthorized;

/// Per-request authorization state.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    authorized: bool,
    claims: Claims,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    /// Claims of the check that authorized the request, if any.
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Evaluate one level of the chain.
    pub async fn evaluate(
        &mut self,
        level: Option<&AuthConfig>,
        authorizer: &dyn Authorizer,
        headers: &HeaderMap,
    ) -> Result<(), Unauthorized> {
        let Some(level) = level else {
            return Ok(());
        };
        if self.authorized {
            return Ok(());
        }

        let outcome = if let Some(expected) = &level.bearer {
            authorizer.bearer(headers, expected).await
        } else if let Some(expected) = &level.credentials {
            authorizer.credentials(headers, expected).await
        } else {
            self.authorized = true;
            return Ok(());
        };

        match outcome {
            Ok(claims) => {
                self.authorized = true;
                self.claims = claims;
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "Authorization check failed");
                Err(Unauthorized)
            }
        }
    }
}
