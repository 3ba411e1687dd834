//! Request dispatch.
//!
//! # Responsibilities
//! - Compose base check, path resolution, auth chain, method lookup and
//!   response generation for one request
//! - Enforce the per-request timeout
//! - Turn a panic inside dispatch into a 500 outcome
//! - Audit and count every terminal outcome
//!
//! # Data Flow
//! ```text
//! Request
//!     → load Snapshot (once; kept for the whole request)
//!     → strip base            (404 on mismatch)
//!     → RouteTable::resolve   (404)
//!     → server auth, path auth (401)
//!     → method lookup         (405)
//!     → method auth           (401)
//!     → content | query | empty
//!     → status, headers, audit
//! ```

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;

use crate::auth::{AuthState, Authorizer};
use crate::http::request::decode_path;
use crate::http::server::AppState;
use crate::observability::{audit, metrics};
use crate::routing::{PathArgs, Response as RouteResponse};
use crate::snapshot::Snapshot;
use crate::store::{self, StoreError};

/// How a request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Served(StatusCode),
    NotFound,
    Unauthorized,
    MethodNotAllowed,
    NotImplemented,
    QueryFailed(StoreError),
    Timeout,
    Internal,
}

impl Outcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Served(status) => *status,
            Outcome::NotFound => StatusCode::NOT_FOUND,
            Outcome::Unauthorized => StatusCode::UNAUTHORIZED,
            Outcome::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Outcome::NotImplemented => StatusCode::GONE,
            Outcome::QueryFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Outcome::Timeout => StatusCode::REQUEST_TIMEOUT,
            Outcome::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Served(status) => write!(f, "{}", status.as_u16()),
            Outcome::NotFound => f.write_str("Not found"),
            Outcome::Unauthorized => f.write_str("Unauthorized"),
            Outcome::MethodNotAllowed => f.write_str("Method not allowed"),
            Outcome::NotImplemented => f.write_str("Not implemented"),
            Outcome::QueryFailed(e) => write!(f, "500 {e}"),
            Outcome::Timeout => f.write_str("Request timeout"),
            Outcome::Internal => f.write_str("Internal error"),
        }
    }
}

/// The result of dispatching one request.
#[derive(Debug)]
pub struct Reply {
    pub outcome: Outcome,
    /// Declared path of the matched route, for metrics.
    pub route: Option<String>,
    pub response: Response,
}

impl Reply {
    fn bare(outcome: Outcome, route: Option<String>) -> Self {
        let response = outcome.status().into_response();
        Self {
            outcome,
            route,
            response,
        }
    }
}

/// The parts of a request dispatch looks at.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub headers: &'a HeaderMap,
}

/// Axum handler for every method and path.
pub async fn handle(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let snapshot = state.snapshot.load();
    let (parts, _body) = request.into_parts();
    let path = decode_path(parts.uri.path());
    let ctx = RequestContext {
        method: &parts.method,
        path: &path,
        headers: &parts.headers,
    };

    let reply = guarded(&snapshot, state.authorizer.as_ref(), ctx).await;

    audit::serving(ctx.method.as_str(), ctx.path, &reply.outcome);
    metrics::record_request(
        ctx.method.as_str(),
        reply.route.as_deref().unwrap_or(metrics::UNMATCHED),
        reply.outcome.status().as_u16(),
        start,
    );
    reply.response
}

/// [`dispatch`] under the snapshot's timeout, with panics caught.
pub async fn guarded(snapshot: &Snapshot, authorizer: &dyn Authorizer, ctx: RequestContext<'_>) -> Reply {
    let work = AssertUnwindSafe(dispatch(snapshot, authorizer, ctx)).catch_unwind();
    match tokio::time::timeout(snapshot.timeout, work).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(panic)) => {
            tracing::error!(path = %ctx.path, panic = %panic_detail(panic.as_ref()), "Dispatch panicked");
            Reply::bare(Outcome::Internal, None)
        }
        Err(_) => {
            tracing::warn!(path = %ctx.path, timeout = ?snapshot.timeout, "Request timed out");
            Reply::bare(Outcome::Timeout, None)
        }
    }
}

/// The message carried by a panic payload.
pub(crate) fn panic_detail(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
}

/// Run the dispatch steps against one snapshot.
pub async fn dispatch(snapshot: &Snapshot, authorizer: &dyn Authorizer, ctx: RequestContext<'_>) -> Reply {
    // 1. Base prefix
    let Some(remainder) = snapshot.strip_base(ctx.path) else {
        return Reply::bare(Outcome::NotFound, None);
    };

    // 2. Path
    let Some(found) = snapshot.routes.resolve(remainder) else {
        return Reply::bare(Outcome::NotFound, None);
    };
    let route = Some(found.route.path.clone());

    // 3. Server, then path auth
    let mut auth = AuthState::new();
    if auth.evaluate(snapshot.auth.as_ref(), authorizer, ctx.headers).await.is_err()
        || auth.evaluate(found.route.auth.as_ref(), authorizer, ctx.headers).await.is_err()
    {
        return Reply::bare(Outcome::Unauthorized, route);
    }

    // 4. Method
    let Some(response) = found.route.response(ctx.method) else {
        return Reply::bare(Outcome::MethodNotAllowed, route);
    };

    // 5. Method auth
    if auth.evaluate(response.auth.as_ref(), authorizer, ctx.headers).await.is_err() {
        return Reply::bare(Outcome::Unauthorized, route);
    }

    // 6. Body
    generate(snapshot, response, &found.args, ctx, route)
}

fn generate(
    snapshot: &Snapshot,
    response: &RouteResponse,
    args: &PathArgs,
    ctx: RequestContext<'_>,
    route: Option<String>,
) -> Reply {
    let mut headers = response.headers.clone();

    let body = if let Some(content) = response.render(args) {
        content
    } else if let Some(query) = &response.query {
        if *ctx.method != Method::GET {
            return Reply::bare(Outcome::NotImplemented, route);
        }
        match &snapshot.store {
            Some(db) => match store::execute(db, query, args) {
                Ok(rows) => {
                    if !headers.contains_key(header::CONTENT_TYPE) {
                        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
                    }
                    rows.to_string()
                }
                Err(e) => {
                    tracing::error!(path = %ctx.path, entity = %query.entity, error = %e, "Query failed");
                    let body = e.to_string();
                    return Reply {
                        response: build(StatusCode::INTERNAL_SERVER_ERROR, headers, body),
                        outcome: Outcome::QueryFailed(e),
                        route,
                    };
                }
            },
            None => {
                tracing::warn!(path = %ctx.path, entity = %query.entity, "Query declared but no storage configured");
                String::new()
            }
        }
    } else {
        String::new()
    };

    Reply {
        outcome: Outcome::Served(response.status),
        response: build(response.status, headers, body),
        route,
    }
}

fn build(status: StatusCode, headers: HeaderMap, body: String) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().extend(headers);
    response
}
