//! Path template matching.
//!
//! # Responsibilities
//! - Compile a declared path into literal and `{name}` segments
//! - Match a request path segment by segment, binding arguments
//!
//! # Design Decisions
//! - Literal segments are lower-cased at compile time and compared
//!   case-insensitively; argument values are bound verbatim
//! - Segment counts must be equal; there are no wildcards or optional parts
//! - No regex: a match is one pass over the segments

use thiserror::Error;

use crate::routing::PathArgs;

/// Why a declared path is not a valid template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("empty argument name in segment `{0}`")]
    EmptyName(String),

    #[error("malformed segment `{0}`: braces must enclose the whole segment")]
    Malformed(String),

    #[error("duplicate argument name `{0}`")]
    DuplicateName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path, e.g. `users/{id}/posts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Compile a path given without its leading slash.
    pub fn parse(path: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        for raw in path.split('/') {
            let segment = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) if name.contains(['{', '}']) => {
                    return Err(TemplateError::Malformed(raw.to_string()))
                }
                Some("") => return Err(TemplateError::EmptyName(raw.to_string())),
                Some(name) => {
                    if segments.iter().any(|s| matches!(s, Segment::Param(n) if n == name)) {
                        return Err(TemplateError::DuplicateName(name.to_string()));
                    }
                    Segment::Param(name.to_string())
                }
                None if raw.contains(['{', '}']) => {
                    return Err(TemplateError::Malformed(raw.to_string()))
                }
                None => Segment::Literal(raw.to_lowercase()),
            };
            segments.push(segment);
        }
        Ok(Self { segments })
    }

    /// True when at least one segment is an argument.
    pub fn is_templated(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Param(_)))
    }

    /// Argument names, in positional order.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Canonical form used to detect duplicate declarations: lower-cased
    /// literals, argument names erased.
    pub fn normalized(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(lit) => lit.as_str(),
                Segment::Param(_) => "{}",
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Match the request path remainder (no leading slash).
    pub fn matches(&self, path: &str) -> Option<PathArgs> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut args = PathArgs::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) => {
                    if *lit != part.to_lowercase() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    args.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(args)
    }
}
