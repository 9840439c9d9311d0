//! Query front end binary for a log-storage cluster.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http server ──▶ admission gate ──▶ router ──▶ handlers
//!                                  (bounded, timed      │
//!                                   wait; 503 on        ▼
//!                                   timeout)        forwarding engine ──▶ storage nodes
//!
//!     lifecycle: cleaner → storage → scratch dir → gate → listener (start)
//!                listener → gate → scratch dir → storage → cleaner (stop)
//! ```

use clap::Parser;

use query_frontend::config::{resolve_config, CliArgs};
use query_frontend::lifecycle::{wait_for_termination, Frontend, StartOptions};
use query_frontend::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config = resolve_config(&args)?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "query-frontend starting");

    tracing::info!(
        listen_address = %config.server.listen_address,
        storage_nodes = config.storage.nodes.len(),
        max_concurrent_requests = config.search.concurrency(),
        max_queue_duration_ms = config.search.max_queue_duration_ms,
        "Configuration loaded"
    );

    let prometheus = if config.observability.metrics_enabled {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    let frontend = Frontend::start_with(
        config,
        StartOptions {
            metrics: prometheus,
            ..StartOptions::default()
        },
    )
    .await?;

    let signal = wait_for_termination().await?;
    tracing::info!(signal, "Received termination signal");

    frontend.shutdown().await?;
    Ok(())
}
