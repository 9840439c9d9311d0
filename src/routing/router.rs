//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Normalize and parse the request path
//! - Classify by family, then by suffix within the family
//! - Invoke the matched handler and count requests/errors per route
//! - Return an explicit outcome: handled, not found, not mine, bad path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - No admission control here; the caller holds a slot for the duration
//! - Foreign prefixes are "not mine" before the tenant token is examined,
//!   so an outer dispatcher never sees a false parse error

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::handlers::{self, Handlers, QueryCall};
use crate::http::response;
use crate::observability::metrics;
use crate::routing::path::{normalize, prefix_of, ParsedPath, PathError};
use crate::routing::table::{Family, RouteTable};

/// Outcome of routing one request.
#[derive(Debug)]
pub enum Dispatch {
    /// A route matched and its handler produced this response
    /// (success or a rendered handler error).
    Handled(Response),
    /// Recognized family, no matching route.
    NotFound,
    /// Unrecognized prefix; some other route table may own it.
    NotMine,
    /// Malformed path or tenant token.
    BadPath(PathError),
}

pub struct Router {
    table: RouteTable,
    handlers: Arc<Handlers>,
}

impl Router {
    pub fn new(table: RouteTable, handlers: Arc<Handlers>) -> Self {
        Self { table, handlers }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    pub async fn dispatch(&self, request: Request<Body>, started_at: Instant) -> Dispatch {
        let path = normalize(request.uri().path());

        let prefix = match prefix_of(&path) {
            Ok(prefix) => prefix,
            Err(e) => return Dispatch::BadPath(e),
        };
        let Some(family) = Family::from_prefix(prefix) else {
            return Dispatch::NotMine;
        };

        let parsed = match ParsedPath::parse(&path) {
            Ok(parsed) => parsed,
            Err(e) => return Dispatch::BadPath(e),
        };

        let Some((route, matched)) = self.table.lookup(family, &parsed.suffix) else {
            return Dispatch::NotFound;
        };

        route.record_request();
        tracing::debug!(
            endpoint = %route.endpoint,
            tenant = %parsed.tenant,
            path = %path,
            "Dispatching request"
        );

        let call = QueryCall {
            endpoint: route.endpoint,
            tenant: parsed.tenant,
            label: matched.param.map(str::to_string),
            path: path.clone(),
            started_at,
            request,
        };

        let result = self.handlers.handle(call).await;
        metrics::record_duration(route.metric_path, started_at);

        match result {
            Ok(res) => Dispatch::Handled(res),
            Err(err) => {
                route.record_error();
                tracing::warn!(
                    endpoint = %route.endpoint,
                    path = %path,
                    status = err.status().as_u16(),
                    error = %err,
                    "Handler failed"
                );
                let mut res = response::query_error(route.endpoint, &path, &err);
                if route.endpoint.allows_cors() {
                    handlers::allow_cors(&mut res);
                }
                Dispatch::Handled(res)
            }
        }
    }
}
