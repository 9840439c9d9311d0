//! HTTP server setup and the front handler.
//!
//! # Responsibilities
//! - Create Axum Router with the built-in and catch-all routes
//! - Wire up middleware (tracing, body limit, request ID)
//! - Admit each query through the gate before routing it
//! - Serve until told to shut down, then drain in-flight requests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admission::{AdmissionGate, QueuePolicy};
use crate::config::ServerConfig;
use crate::http::body;
use crate::http::request::{request_id, UuidRequestId};
use crate::http::response;
use crate::routing::{Dispatch, Router as QueryRouter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: AdmissionGate,
    pub queue: QueuePolicy,
    pub router: Arc<QueryRouter>,
    pub metrics: Option<PrometheusHandle>,
}

/// HTTP server for the query front end.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServerConfig, state: AppState) -> Self {
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(root_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/{*path}", any(front_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The assembled router, for serving or for driving in tests.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve on `listener` until `shutdown` fires, then wait for in-flight
    /// requests to finish.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!(address = %addr, "HTTP server draining");
            })
            .await?;

        tracing::info!(address = %addr, "HTTP server stopped");
        Ok(())
    }
}

async fn root_handler() -> &'static str {
    response::IDENTIFICATION
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics are disabled").into_response(),
    }
}

/// Admit, then route.
async fn front_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started_at = Instant::now();
    let request_id = request_id(&request).to_string();
    let path = request.uri().path().to_string();

    let max_wait = state.queue.max_wait_for_query(request.uri().query());
    let slot = match state.gate.acquire(max_wait).await {
        Ok(slot) => slot,
        Err(rejection) => {
            tracing::debug!(
                request_id = %request_id,
                path = %path,
                rejection = %rejection,
                "Request not admitted"
            );
            return response::rejection(&rejection);
        }
    };

    match state.router.dispatch(request, started_at).await {
        // Streaming bodies (tail, export) keep the slot until they finish.
        Dispatch::Handled(res) => body::hold(res, slot),
        Dispatch::NotFound => {
            tracing::debug!(request_id = %request_id, path = %path, "No route matched");
            response::not_found(&path)
        }
        Dispatch::NotMine => {
            tracing::debug!(request_id = %request_id, path = %path, "Path outside known families");
            response::not_found(&path)
        }
        Dispatch::BadPath(err) => {
            tracing::warn!(request_id = %request_id, path = %path, error = %err, "Cannot parse path");
            response::path_error(&path, &err)
        }
    }
}
