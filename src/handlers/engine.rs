//! The seam between request dispatch and query execution.

use std::time::Instant;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use thiserror::Error;

use crate::handlers::endpoint::Endpoint;
use crate::routing::path::TenantToken;

/// Everything a handler knows about an admitted, routed request.
#[derive(Debug)]
pub struct QueryCall {
    pub endpoint: Endpoint,
    pub tenant: TenantToken,
    /// Label name captured from `label/<name>/values`.
    pub label: Option<String>,
    /// Normalized request path.
    pub path: String,
    /// When the request reached the front end, before any queueing.
    pub started_at: Instant,
    pub request: Request<Body>,
}

/// A failed query. Carries the status code to reply with when the
/// underlying failure knows it; otherwise the reply is 422.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
    status: Option<StatusCode>,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Status to reply with.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::UNPROCESSABLE_ENTITY)
    }
}

/// Executes queries on behalf of the front end.
#[async_trait]
pub trait QueryEngine: Send + Sync + 'static {
    async fn execute(&self, call: QueryCall) -> Result<Response, QueryError>;
}
