//! Bearer and credentials checks.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};

use crate::auth::basic::credential_claims;
use crate::auth::{satisfies, AuthError, Claims, JwksCache};

/// Performs the two kinds of check an auth level can declare.
///
/// Each returns the actual claims when they satisfy `expected`.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn bearer(&self, headers: &HeaderMap, expected: &Claims) -> Result<Claims, AuthError>;

    async fn credentials(&self, headers: &HeaderMap, expected: &Claims) -> Result<Claims, AuthError>;
}

/// Reads the `Authorization` header: `Bearer <jwt>` or `Basic <b64>`.
#[derive(Clone, Default)]
pub struct HeaderAuthorizer {
    jwks: JwksCache,
}

#[async_trait]
impl Authorizer for HeaderAuthorizer {
    async fn bearer(&self, headers: &HeaderMap, expected: &Claims) -> Result<Claims, AuthError> {
        let token = authorization(headers, "Bearer")?;
        let claims = self.jwks.verify(token).await?;
        check(expected, claims)
    }

    async fn credentials(&self, headers: &HeaderMap, expected: &Claims) -> Result<Claims, AuthError> {
        let encoded = authorization(headers, "Basic")?;
        let claims = credential_claims(encoded)?;
        check(expected, claims)
    }
}

fn check(expected: &Claims, actual: Claims) -> Result<Claims, AuthError> {
    if satisfies(expected, &actual) {
        Ok(actual)
    } else {
        Err(AuthError::ClaimsMismatch)
    }
}

/// The parameter of an `Authorization: <scheme> <param>` header.
fn authorization<'a>(headers: &'a HeaderMap, scheme: &'static str) -> Result<&'a str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingHeader)?;
    match value.split_once(' ') {
        Some((given, param)) if given.eq_ignore_ascii_case(scheme) => Ok(param.trim()),
        _ => Err(AuthError::Scheme(scheme)),
    }
}
