//! Command-line flags.
//!
//! Every flag is optional; a flag that is present overrides the matching
//! value from the config file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::FrontendConfig;

/// Query-serving front end for a distributed log-storage cluster.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "query-frontend", version, about)]
pub struct CliArgs {
    /// Path to a TOML config file.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Address to listen for HTTP connections.
    #[arg(long)]
    pub listen_address: Option<String>,

    /// Storage node address; repeat for several nodes.
    #[arg(long = "storage-node")]
    pub storage_nodes: Vec<String>,

    /// Maximum number of concurrent search requests.
    #[arg(long)]
    pub max_concurrent_requests: Option<usize>,

    /// Maximum wait for a free slot once the concurrency limit is reached.
    #[arg(long)]
    pub max_queue_duration_ms: Option<u64>,

    /// Maximum query duration; caps the per-request `timeout` argument.
    #[arg(long)]
    pub max_query_duration_ms: Option<u64>,

    /// Directory for cache files.
    #[arg(long)]
    pub cache_data_path: Option<String>,

    /// Log level filter.
    #[arg(long)]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut FrontendConfig) {
        if let Some(addr) = &self.listen_address {
            config.server.listen_address = addr.clone();
        }
        if !self.storage_nodes.is_empty() {
            config.storage.nodes = self.storage_nodes.clone();
        }
        if let Some(n) = self.max_concurrent_requests {
            config.search.max_concurrent_requests = Some(n);
        }
        if let Some(ms) = self.max_queue_duration_ms {
            config.search.max_queue_duration_ms = ms;
        }
        if let Some(ms) = self.max_query_duration_ms {
            config.search.max_query_duration_ms = ms;
        }
        if let Some(path) = &self.cache_data_path {
            config.cache_data_path = Some(path.clone());
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}
