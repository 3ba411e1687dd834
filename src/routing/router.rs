//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes and their per-method responses
//! - Resolve a request path to a route and its bound arguments
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) static lookup via HashMap on the lower-cased path
//! - O(n) templated scan (acceptable for typical route counts)

use std::collections::HashMap;

use axum::http::{HeaderMap, Method, StatusCode};
use indexmap::IndexMap;

use crate::config::schema::{AuthConfig, PathConfig, QueryConfig, ResponseConfig};
use crate::config::validation::{parse_headers, parse_method, parse_status, ValidationError};
use crate::routing::{PathArgs, PathTemplate};

/// What to emit for one method of a route.
#[derive(Debug, Clone)]
pub struct Response {
    pub auth: Option<AuthConfig>,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub content: Option<String>,
    pub query: Option<QueryConfig>,
}

impl Response {
    fn build(path: &str, method: &str, config: &ResponseConfig) -> Result<Self, ValidationError> {
        let content = match &config.content {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
        };
        Ok(Self {
            auth: config.auth.clone(),
            status: parse_status(path, method, config.status_code)?,
            headers: parse_headers(path, method, &config.headers)?,
            content,
            query: config.query.clone(),
        })
    }

    /// The literal content with every `{name}` replaced by its argument.
    ///
    /// One pass over the content: substituted values are never rescanned.
    pub fn render(&self, args: &PathArgs) -> Option<String> {
        self.content.as_deref().map(|content| substitute(content, args))
    }
}

fn substitute(content: &str, args: &PathArgs) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let bound = tail
            .find('}')
            .and_then(|close| args.get(&tail[1..close]).map(|value| (close, value)));
        match bound {
            Some((close, value)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// A declared path.
#[derive(Debug, Clone)]
pub struct Route {
    /// The path as declared, without leading slash.
    pub path: String,
    pub auth: Option<AuthConfig>,
    pub methods: HashMap<Method, Response>,
}

impl Route {
    fn build(path: &str, config: &PathConfig) -> Result<Self, ValidationError> {
        let mut methods = HashMap::with_capacity(config.methods.len());
        for (name, response) in &config.methods {
            let method = parse_method(path, name)?;
            methods.insert(method, Response::build(path, name, response)?);
        }
        Ok(Self {
            path: path.to_string(),
            auth: config.auth.clone(),
            methods,
        })
    }

    pub fn response(&self, method: &Method) -> Option<&Response> {
        self.methods.get(method)
    }
}

/// A resolved route and the arguments bound by its template.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub args: PathArgs,
}

/// Every declared route, compiled.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    static_routes: HashMap<String, Route>,
    templated: Vec<(PathTemplate, Route)>,
}

impl RouteTable {
    /// Compile the document's paths. Expects a validated document; the first
    /// problem found is returned.
    pub fn build(paths: &IndexMap<String, PathConfig>) -> Result<Self, ValidationError> {
        let mut table = Self::default();
        for (declared, config) in paths {
            let path = route_key(declared);
            let template = PathTemplate::parse(path).map_err(|source| ValidationError::Template {
                path: declared.clone(),
                source,
            })?;
            let route = Route::build(path, config)?;

            if template.is_templated() {
                table.templated.push((template, route));
            } else {
                table.static_routes.insert(path.to_lowercase(), route);
            }
        }
        Ok(table)
    }

    /// Resolve a path remainder (base stripped, no leading slash).
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        // 1. Static exact match
        if let Some(route) = self.static_routes.get(&path.to_lowercase()) {
            return Some(RouteMatch {
                route,
                args: PathArgs::new(),
            });
        }

        // 2. Templated, first match wins
        self.templated.iter().find_map(|(template, route)| {
            template.matches(path).map(|args| RouteMatch { route, args })
        })
    }

    pub fn len(&self) -> usize {
        self.static_routes.len() + self.templated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared paths with their methods, for startup logs.
    pub fn describe(&self) -> Vec<String> {
        let routes = self
            .static_routes
            .values()
            .chain(self.templated.iter().map(|(_, route)| route));
        let mut lines: Vec<String> = routes
            .map(|route| {
                let mut methods: Vec<&str> = route.methods.keys().map(Method::as_str).collect();
                methods.sort_unstable();
                format!("/{} [{}]", route.path, methods.join(", "))
            })
            .collect();
        lines.sort();
        lines
    }
}

/// A declared path as used for lookup: leading slashes removed.
pub fn route_key(declared: &str) -> &str {
    declared.trim_start_matches('/')
}
