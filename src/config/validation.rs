//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacity > 0, durations, addresses)
//! - Refuse to start without storage nodes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FrontendConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::schema::FrontendConfig;

/// Largest slot count the admission gate can hold.
pub const MAX_CONCURRENCY: usize = Semaphore::MAX_PERMITS;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid listen address {0:?}")]
    ListenAddress(String),
    #[error("at least one storage node is required")]
    NoStorageNodes,
    #[error("empty storage node address at position {0}")]
    EmptyStorageNode(usize),
    #[error("search.max_concurrent_requests must be positive")]
    ZeroConcurrency,
    #[error("search.max_concurrent_requests {0} exceeds the maximum of {1}")]
    ConcurrencyTooLarge(usize, usize),
    #[error("search.max_query_duration_ms must be positive")]
    ZeroQueryDuration,
    #[error("storage.request_timeout_secs must be positive")]
    ZeroStorageTimeout,
    #[error("unknown log format {0:?}; expected \"json\" or \"pretty\"")]
    LogFormat(String),
}

/// Validate a fully-merged configuration.
pub fn validate_config(config: &FrontendConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.listen_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::ListenAddress(
            config.server.listen_address.clone(),
        ));
    }

    if config.storage.nodes.is_empty() {
        errors.push(ValidationError::NoStorageNodes);
    }
    for (i, node) in config.storage.nodes.iter().enumerate() {
        if node.trim().is_empty() {
            errors.push(ValidationError::EmptyStorageNode(i));
        }
    }

    match config.search.max_concurrent_requests {
        Some(0) => errors.push(ValidationError::ZeroConcurrency),
        Some(n) if n > MAX_CONCURRENCY => {
            errors.push(ValidationError::ConcurrencyTooLarge(n, MAX_CONCURRENCY))
        }
        _ => {}
    }
    // A zero queue ceiling is legal: requests are shed as soon as the gate is full.
    if config.search.max_query_duration_ms == 0 {
        errors.push(ValidationError::ZeroQueryDuration);
    }
    if config.storage.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroStorageTimeout);
    }

    match config.observability.log_format.as_str() {
        "json" | "pretty" | "text" => {}
        other => errors.push(ValidationError::LogFormat(other.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
