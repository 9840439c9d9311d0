//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, body limit, tracing)
//!     → "/" | "/health" | "/metrics" answered directly
//!     → everything else: admission gate → query router
//!     → response.rs (error bodies for rejections and misses)
//!     → body.rs (slot held until the response body finishes)
//! ```

pub mod body;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
