//! Error responses produced at the edge.
//!
//! # Responsibilities
//! - Render handler failures per endpoint style (JSON document or text)
//! - Render admission rejections as 503 with actionable remediation
//! - Render path/token errors as 400

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::admission::Rejection;
use crate::handlers::{Endpoint, QueryError, ResponseStyle};
use crate::routing::path::PathError;

/// Banner returned for `/`.
pub const IDENTIFICATION: &str =
    "query-frontend - the query-serving component of the log storage cluster";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDocument<'a> {
    status: &'static str,
    error_type: String,
    error: &'a str,
}

/// Render a handler failure.
pub fn query_error(endpoint: Endpoint, path: &str, err: &QueryError) -> Response {
    let status = err.status();
    match endpoint.style() {
        ResponseStyle::Json => (
            status,
            Json(ErrorDocument {
                status: "error",
                error_type: status.as_u16().to_string(),
                error: err.message(),
            }),
        )
            .into_response(),
        ResponseStyle::Plain | ResponseStyle::NoContent => {
            (status, format!("error in {:?}: {}", path, err.message())).into_response()
        }
    }
}

/// Render an admission rejection.
pub fn rejection(rejection: &Rejection) -> Response {
    let body = match rejection {
        Rejection::TimedOut { .. } => format!(
            "{}; possible solutions: increase `search.max_queue_duration`; \
             increase `search.max_query_duration`; increase `search.max_concurrent_requests`; \
             increase server capacity",
            rejection
        ),
        Rejection::Closed => rejection.to_string(),
    };
    (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
}

/// Render a malformed path or tenant token.
pub fn path_error(path: &str, err: &PathError) -> Response {
    let body = match err {
        PathError::Token(_) => err.to_string(),
        _ => format!("cannot parse path {:?}: {}", path, err),
    };
    (StatusCode::BAD_REQUEST, body).into_response()
}

/// Render "no such endpoint" for both in-family misses and foreign prefixes.
pub fn not_found(path: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("unsupported path requested: {:?}", path)).into_response()
}
