//! Document validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Path templates, methods, status codes, headers
//! - Listener settings (TLS paths, metrics address)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Document → Result<(), Vec<ValidationError>>
//! - Store schema problems are reported by the store build, not here

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use indexmap::IndexMap;
use thiserror::Error;

use crate::config::schema::Document;
use crate::routing::router::route_key;
use crate::routing::{PathTemplate, TemplateError};

/// A semantic problem in a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("path `{path}`: {source}")]
    Template {
        path: String,
        #[source]
        source: TemplateError,
    },

    #[error("path `{path}` duplicates `{existing}`")]
    DuplicatePath { path: String, existing: String },

    #[error("path `{path}`: invalid method `{method}`")]
    InvalidMethod { path: String, method: String },

    #[error("path `{path}`: method `{method}` declared more than once")]
    DuplicateMethod { path: String, method: String },

    #[error("path `{path}` {method}: invalid status {status}")]
    InvalidStatus { path: String, method: String, status: u16 },

    #[error("path `{path}` {method}: invalid header `{name}`")]
    InvalidHeader { path: String, method: String, name: String },

    #[error("path `{path}` {method}: query names no entity")]
    EmptyQueryEntity { path: String, method: String },

    #[error("tls: `{0}` must not be empty")]
    EmptyTlsPath(&'static str),

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),
}

/// Check every semantic rule and collect all failures.
pub fn validate_document(doc: &Document) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // 1. Listener
    if let Some(tls) = &doc.tls {
        if tls.cert_file.is_empty() {
            errors.push(ValidationError::EmptyTlsPath("certFile"));
        }
        if tls.key_file.is_empty() {
            errors.push(ValidationError::EmptyTlsPath("keyFile"));
        }
    }
    if let Some(addr) = &doc.metrics {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::MetricsAddress(addr.clone()));
        }
    }

    // 2. Paths
    let mut seen: HashMap<String, &str> = HashMap::new();
    for (declared, config) in &doc.paths {
        let path = route_key(declared);
        match PathTemplate::parse(path) {
            Ok(template) => {
                if let Some(existing) = seen.insert(template.normalized(), declared) {
                    errors.push(ValidationError::DuplicatePath {
                        path: declared.clone(),
                        existing: existing.to_string(),
                    });
                }
            }
            Err(source) => errors.push(ValidationError::Template {
                path: declared.clone(),
                source,
            }),
        }

        // 3. Methods
        let mut methods = Vec::with_capacity(config.methods.len());
        for (name, response) in &config.methods {
            match parse_method(path, name) {
                Ok(method) if methods.contains(&method) => {
                    errors.push(ValidationError::DuplicateMethod {
                        path: path.to_string(),
                        method: method.to_string(),
                    })
                }
                Ok(method) => methods.push(method),
                Err(e) => errors.push(e),
            }
            if let Err(e) = parse_status(path, name, response.status_code) {
                errors.push(e);
            }
            if let Err(e) = parse_headers(path, name, &response.headers) {
                errors.push(e);
            }
            if response.query.as_ref().is_some_and(|q| q.entity.trim().is_empty()) {
                errors.push(ValidationError::EmptyQueryEntity {
                    path: path.to_string(),
                    method: name.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Method names are case-insensitive in documents.
pub fn parse_method(path: &str, name: &str) -> Result<Method, ValidationError> {
    let invalid = || ValidationError::InvalidMethod {
        path: path.to_string(),
        method: name.to_string(),
    };
    if name.is_empty() {
        return Err(invalid());
    }
    Method::from_bytes(name.to_uppercase().as_bytes()).map_err(|_| invalid())
}

/// Zero means 200.
pub fn parse_status(path: &str, method: &str, status: u16) -> Result<StatusCode, ValidationError> {
    if status == 0 {
        return Ok(StatusCode::OK);
    }
    StatusCode::from_u16(status).map_err(|_| ValidationError::InvalidStatus {
        path: path.to_string(),
        method: method.to_string(),
        status,
    })
}

pub fn parse_headers(
    path: &str,
    method: &str,
    headers: &IndexMap<String, String>,
) -> Result<HeaderMap, ValidationError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = || ValidationError::InvalidHeader {
            path: path.to_string(),
            method: method.to_string(),
            name: name.clone(),
        };
        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        map.insert(header, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> Document {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_document() {
        let doc = doc(r#"
paths:
  /person/{name}:
    methods:
      get:
        status: 200
        headers:
          content-type: text/plain
        content: "Hi {name}"
  /health:
    methods:
      GET: {}
"#);
        assert_eq!(validate_document(&doc), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let doc = doc(r#"
metrics: "not an address"
tls:
  certFile: ""
  keyFile: key.pem
paths:
  /users/{}:
    methods:
      get: {}
  /a/{x}:
    methods:
      "bad method": {}
      get:
        status: 1000
        headers:
          "bad header": x
  /A/{y}:
    methods:
      post:
        query:
          entity: ""
"#);
        let errors = validate_document(&doc).unwrap_err();
        assert!(errors.contains(&ValidationError::MetricsAddress("not an address".into())));
        assert!(errors.contains(&ValidationError::EmptyTlsPath("certFile")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Template { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidMethod { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidStatus { status: 1000, .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidHeader { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicatePath { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyQueryEntity { .. })));
        assert_eq!(errors.len(), 8);
    }

    #[test]
    fn test_method_case_duplicates() {
        let doc = doc("paths:\n  /x:\n    methods:\n      get: {}\n      GET: {}\n");
        assert_eq!(
            validate_document(&doc),
            Err(vec![ValidationError::DuplicateMethod {
                path: "x".into(),
                method: "GET".into()
            }])
        );
    }

    #[test]
    fn test_zero_status_is_ok() {
        assert_eq!(parse_status("x", "GET", 0), Ok(StatusCode::OK));
        assert_eq!(parse_method("x", "patch"), Ok(Method::PATCH));
    }
}
