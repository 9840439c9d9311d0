//! Storage connectivity subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     StorageConfig.nodes → nodes.rs (parse addresses, build client)
//!
//! Per admitted request:
//!     handlers → forward.rs (ForwardingEngine)
//!         → nodes.rs (round-robin pick, skip unhealthy)
//!         → node.rs (in-flight count, passive health)
//!         → storage node over HTTP
//!
//! Shutdown:
//!     lifecycle stops nodes.rs only after the listener has drained
//! ```
//!
//! # Design Decisions
//! - No eager connections at startup; address errors are still fatal
//! - Passive health only: consecutive failures/successes flip node state
//! - No retries; a failed call surfaces to the client as-is

pub mod forward;
pub mod node;
pub mod nodes;

use axum::http::StatusCode;
use thiserror::Error;

pub use forward::ForwardingEngine;
pub use node::StorageNode;
pub use nodes::StorageNodes;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing storage nodes; at least one is required")]
    NoNodes,
    #[error("invalid storage node address {0:?}: {1}")]
    InvalidAddress(String, String),
    #[error("no healthy storage nodes available")]
    NoHealthyNodes,
    #[error("storage connectivity is stopped")]
    Stopped,
}

impl StorageError {
    /// Status to report when this error reaches a client.
    pub fn status(&self) -> StatusCode {
        match self {
            StorageError::NoNodes | StorageError::InvalidAddress(..) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            StorageError::NoHealthyNodes | StorageError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
