//! Request handler subsystem.
//!
//! # Data Flow
//! ```text
//! Router match (endpoint, tenant, label, request)
//!     → Handlers::handle
//!         → status/active_queries: answered locally from active.rs
//!         → everything else: registered in active.rs, then engine.rs
//!           (QueryEngine::execute, by default storage::ForwardingEngine)
//!     → success shaped per endpoint (CORS, 204 for deletes); the
//!       active-query entry rides in the body until it is sent
//!     → failure returned as QueryError for the router to render
//! ```
//!
//! # Design Decisions
//! - Handlers are thin; query semantics live behind the QueryEngine trait
//! - The engine is injected, so dispatch is testable without storage nodes

pub mod active;
pub mod endpoint;
pub mod engine;

use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};

use crate::http::body;

pub use active::ActiveQueries;
pub use endpoint::{Endpoint, ResponseStyle};
pub use engine::{QueryCall, QueryEngine, QueryError};

/// The handler set invoked by the router once a request is admitted.
#[derive(Clone)]
pub struct Handlers {
    engine: Arc<dyn QueryEngine>,
    active: ActiveQueries,
}

impl Handlers {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self {
            engine,
            active: ActiveQueries::new(),
        }
    }

    pub fn active_queries(&self) -> &ActiveQueries {
        &self.active
    }

    pub async fn handle(&self, call: QueryCall) -> Result<Response, QueryError> {
        let endpoint = call.endpoint;
        if endpoint == Endpoint::ActiveQueries {
            return Ok(Json(self.active.to_json()).into_response());
        }

        let tracked = self.active.register(
            endpoint,
            call.tenant,
            &call.path,
            call.request.uri().query().unwrap_or_default(),
            call.started_at,
        );
        let response = self.engine.execute(call).await?;
        // The entry stays listed while the body streams.
        Ok(body::hold(shape(endpoint, response), tracked))
    }
}

fn shape(endpoint: Endpoint, mut response: Response) -> Response {
    if endpoint.style() == ResponseStyle::NoContent {
        return StatusCode::NO_CONTENT.into_response();
    }
    if endpoint.allows_cors() {
        allow_cors(&mut response);
    }
    response
}

/// Let browsers read the response from any origin.
pub fn allow_cors(response: &mut Response) {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::path::TenantToken;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Instant;

    struct Echo;

    #[async_trait]
    impl QueryEngine for Echo {
        async fn execute(&self, call: QueryCall) -> Result<Response, QueryError> {
            Ok(call.endpoint.name().into_response())
        }
    }

    fn call(endpoint: Endpoint) -> QueryCall {
        QueryCall {
            endpoint,
            tenant: TenantToken::default(),
            label: None,
            path: "/select/0/x".into(),
            started_at: Instant::now(),
            request: Request::new(Body::empty()),
        }
    }

    #[tokio::test]
    async fn delete_success_is_no_content() {
        let handlers = Handlers::new(Arc::new(Echo));
        let res = handlers.handle(call(Endpoint::DeleteSeries)).await.unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn query_endpoints_allow_cors() {
        let handlers = Handlers::new(Arc::new(Echo));
        let res = handlers.handle(call(Endpoint::Query)).await.unwrap();
        assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let res = handlers.handle(call(Endpoint::Export)).await.unwrap();
        assert!(res
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn active_queries_served_locally() {
        let handlers = Handlers::new(Arc::new(Echo));
        let res = handlers
            .handle(call(Endpoint::ActiveQueries))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(handlers.active_queries().is_empty());
    }

    #[tokio::test]
    async fn query_stays_active_until_body_is_dropped() {
        let handlers = Handlers::new(Arc::new(Echo));
        let res = handlers.handle(call(Endpoint::Tail)).await.unwrap();
        assert_eq!(handlers.active_queries().len(), 1);

        drop(res);
        assert!(handlers.active_queries().is_empty());
    }
}
