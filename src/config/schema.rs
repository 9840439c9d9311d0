//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the front end.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hard ceiling for the default concurrency capacity. A single query can
/// saturate every core, so more concurrent queries only contend for CPU.
pub const MAX_DEFAULT_CONCURRENCY: usize = 16;

/// Root configuration for the query front end.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FrontendConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Admission control and query duration limits.
    pub search: SearchConfig,

    /// Remote storage tier.
    pub storage: StorageConfig,

    /// Directory for cache files. Scratch state is not kept across restarts
    /// when unset.
    pub cache_data_path: Option<String>,

    /// Background scratch cleanup.
    pub scratch: ScratchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8481").
    pub listen_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8481".to_string(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Search limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of concurrently executing search requests.
    /// Derived from CPU parallelism when unset.
    pub max_concurrent_requests: Option<usize>,

    /// Maximum time a request waits for a slot once the limit is reached.
    pub max_queue_duration_ms: u64,

    /// Maximum query duration; also caps the per-request `timeout` hint.
    pub max_query_duration_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: None,
            max_queue_duration_ms: 10_000,
            max_query_duration_ms: 30_000,
        }
    }
}

impl SearchConfig {
    /// Effective concurrency capacity.
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_requests
            .unwrap_or_else(default_max_concurrent_requests)
    }

    pub fn max_queue_duration(&self) -> Duration {
        Duration::from_millis(self.max_queue_duration_ms)
    }

    pub fn max_query_duration(&self) -> Duration {
        Duration::from_millis(self.max_query_duration_ms)
    }
}

/// Default capacity: twice the core count on small machines, the core count
/// otherwise, never above [`MAX_DEFAULT_CONCURRENCY`].
pub fn default_max_concurrent_requests() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    concurrency_for_cpus(cpus)
}

pub(crate) fn concurrency_for_cpus(cpus: usize) -> usize {
    let n = if cpus <= 4 { cpus * 2 } else { cpus };
    n.clamp(1, MAX_DEFAULT_CONCURRENCY)
}

/// Remote storage tier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage node addresses (`host:port` or `http://host:port`).
    pub nodes: Vec<String>,

    /// Per-call timeout for storage requests in seconds.
    pub request_timeout_secs: u64,

    /// Number of consecutive failures before a node is skipped.
    pub unhealthy_threshold: u32,

    /// Number of consecutive successes before a node is used again.
    pub healthy_threshold: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            request_timeout_secs: 30,
            unhealthy_threshold: 3,
            healthy_threshold: 1,
        }
    }
}

/// Scratch directory sweep settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// How often the sweeper runs, in seconds.
    pub sweep_interval_secs: u64,

    /// Files older than this are removed by the sweeper, in seconds.
    pub max_file_age_secs: u64,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            max_file_age_secs: 3600,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "json" or "pretty".
    pub log_format: String,

    /// Serve Prometheus metrics at `/metrics`.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
        }
    }
}
