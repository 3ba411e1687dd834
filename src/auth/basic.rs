//! Basic credentials.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use serde_json::Value;

use crate::auth::{AuthError, Claims};

/// Decode the payload of a `Basic` authorization header into claims:
/// `username`, `password`, and the pair itself as `<username>: <password>`.
pub fn credential_claims(encoded: &str) -> Result<Claims, AuthError> {
    let bytes = STANDARD
        .decode(encoded)
        .or_else(|_| URL_SAFE.decode(encoded))
        .map_err(|e| AuthError::Credentials(e.to_string()))?;
    let decoded = String::from_utf8(bytes).map_err(|e| AuthError::Credentials(e.to_string()))?;

    let (username, password) = decoded.split_once(':').unwrap_or((decoded.as_str(), ""));
    let mut claims = Claims::new();
    claims.insert("username".into(), Value::String(username.to_string()));
    claims.insert("password".into(), Value::String(password.to_string()));
    claims.insert(username.to_string(), Value::String(password.to_string()));
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_and_password() {
        let claims = credential_claims(&STANDARD.encode("joe:s3cr3t")).unwrap();
        assert_eq!(claims["username"], "joe");
        assert_eq!(claims["password"], "s3cr3t");
        assert_eq!(claims["joe"], "s3cr3t");
    }

    #[test]
    fn test_password_may_contain_colons() {
        let claims = credential_claims(&STANDARD.encode("joe:a:b")).unwrap();
        assert_eq!(claims["password"], "a:b");
    }

    #[test]
    fn test_missing_password_is_empty() {
        let claims = credential_claims(&URL_SAFE.encode("joe")).unwrap();
        assert_eq!(claims["password"], "");
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(credential_claims("%%%").is_err());
    }
}
