//! Startup orchestration.
//!
//! # Responsibilities
//! - Start subsystems in dependency order, listener last
//! - Hand the started subsystems to the coordinator for reverse shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, nothing runs half-initialized
//! - Start order: scratch cleaner, storage nodes, scratch directory,
//!   admission gate, HTTP listener. Shutdown therefore stops the listener
//!   first and the cleaner last.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::admission::{AdmissionGate, QueuePolicy};
use crate::config::{FrontendConfig, ServerConfig};
use crate::handlers::{Handlers, QueryEngine};
use crate::http::server::{AppState, HttpServer};
use crate::lifecycle::coordinator::{BoxError, Lifecycle, LifecycleError, Subsystem};
use crate::lifecycle::Shutdown;
use crate::routing::{Router, RouteTable};
use crate::scratch::{dir::scratch_path, ScratchCleaner, ScratchDir};
use crate::storage::{ForwardingEngine, StorageNodes};

/// Optional overrides for [`Frontend::start_with`].
#[derive(Default)]
pub struct StartOptions {
    /// Query engine to use instead of forwarding to storage nodes.
    pub engine: Option<Arc<dyn QueryEngine>>,
    /// Prometheus handle served on `/metrics`.
    pub metrics: Option<PrometheusHandle>,
}

/// A running query front end.
pub struct Frontend {
    lifecycle: Lifecycle,
    local_addr: SocketAddr,
    gate: AdmissionGate,
    storage: Arc<StorageNodes>,
    handlers: Arc<Handlers>,
}

impl Frontend {
    pub async fn start(config: FrontendConfig) -> Result<Self, LifecycleError> {
        Self::start_with(config, StartOptions::default()).await
    }

    pub async fn start_with(
        config: FrontendConfig,
        options: StartOptions,
    ) -> Result<Self, LifecycleError> {
        let started_at = Instant::now();
        let mut lifecycle = Lifecycle::new();
        let cache_root = config.cache_data_path.as_deref().map(Path::new);

        let cleaner = ScratchCleaner::new(cache_root.map(scratch_path), &config.scratch);
        lifecycle
            .start("scratch cleaner", async {
                Ok::<_, Infallible>(CleanerTask::spawn(cleaner))
            })
            .await?;

        let storage = lifecycle
            .start("storage nodes", async { StorageNodes::connect(&config.storage) })
            .await?;

        lifecycle
            .start("scratch directory", ScratchDir::init(cache_root))
            .await?;

        let gate = lifecycle
            .start("admission gate", async {
                Ok::<_, Infallible>(GateSubsystem(AdmissionGate::new(
                    config.search.concurrency(),
                )))
            })
            .await?;
        let gate = gate.0.clone();

        let engine = options
            .engine
            .unwrap_or_else(|| Arc::new(ForwardingEngine::new(storage.clone())));
        let handlers = Arc::new(Handlers::new(engine));
        let state = AppState {
            gate: gate.clone(),
            queue: QueuePolicy::from_config(&config.search),
            router: Arc::new(Router::new(RouteTable::standard(), handlers.clone())),
            metrics: options.metrics,
        };

        let listener = lifecycle
            .start("http listener", HttpListener::bind(&config.server, state))
            .await?;

        tracing::info!(
            address = %listener.local_addr,
            capacity = gate.capacity(),
            storage_nodes = storage.nodes().len(),
            elapsed_secs = started_at.elapsed().as_secs_f64(),
            "Query front end started"
        );

        Ok(Self {
            lifecycle,
            local_addr: listener.local_addr,
            gate,
            storage,
            handlers,
        })
    }

    /// Address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn storage(&self) -> &Arc<StorageNodes> {
        &self.storage
    }

    pub fn handlers(&self) -> &Arc<Handlers> {
        &self.handlers
    }

    /// Stop everything in reverse start order.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        tracing::info!(address = %self.local_addr, "Shutting down query front end");
        self.lifecycle.shutdown().await
    }
}

/// The HTTP listener plus its serving task.
struct HttpListener {
    local_addr: SocketAddr,
    gate: AdmissionGate,
    shutdown: Shutdown,
    task: Mutex<Option<JoinHandle<std::io::Result<()>>>>,
}

impl HttpListener {
    async fn bind(config: &ServerConfig, state: AppState) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.listen_address).await?;
        let local_addr = listener.local_addr()?;
        let gate = state.gate.clone();

        let shutdown = Shutdown::new();
        let server = HttpServer::new(config, state);
        let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

        Ok(Self {
            local_addr,
            gate,
            shutdown,
            task: Mutex::new(Some(task)),
        })
    }
}

#[async_trait]
impl Subsystem for HttpListener {
    /// Refuse new admissions, stop accepting, and wait for every in-flight
    /// request to finish.
    async fn stop(&self) -> Result<(), BoxError> {
        self.gate.drain();
        self.shutdown.trigger();

        let Some(task) = self.task.lock().await.take() else {
            return Ok(());
        };
        task.await??;
        Ok(())
    }
}

/// The admission gate as a stoppable subsystem.
struct GateSubsystem(AdmissionGate);

#[async_trait]
impl Subsystem for GateSubsystem {
    async fn stop(&self) -> Result<(), BoxError> {
        let occupied = self.0.occupied();
        if occupied != 0 {
            tracing::warn!(occupied, "Admission gate still has occupied slots after drain");
        }
        self.0.close();
        Ok(())
    }
}

#[async_trait]
impl Subsystem for StorageNodes {
    async fn stop(&self) -> Result<(), BoxError> {
        StorageNodes::stop(self);
        Ok(())
    }
}

#[async_trait]
impl Subsystem for ScratchDir {
    async fn stop(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// The background scratch sweep.
struct CleanerTask {
    shutdown: Shutdown,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CleanerTask {
    fn spawn(cleaner: ScratchCleaner) -> Self {
        let shutdown = Shutdown::new();
        let task = cleaner.spawn(shutdown.subscribe());
        Self {
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }
}

#[async_trait]
impl Subsystem for CleanerTask {
    async fn stop(&self) -> Result<(), BoxError> {
        self.shutdown.trigger();
        if let Some(task) = self.task.lock().await.take() {
            task.await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;

    fn config() -> FrontendConfig {
        FrontendConfig {
            server: ServerConfig {
                listen_address: "127.0.0.1:0".to_string(),
                ..ServerConfig::default()
            },
            storage: StorageConfig {
                nodes: vec!["127.0.0.1:1".to_string()],
                ..StorageConfig::default()
            },
            ..FrontendConfig::default()
        }
    }

    #[tokio::test]
    async fn starts_and_stops_cleanly() {
        let frontend = Frontend::start(config()).await.unwrap();
        assert_ne!(frontend.local_addr().port(), 0);
        assert!(!frontend.storage().is_stopped());

        let gate = frontend.gate().clone();
        let storage = frontend.storage().clone();
        frontend.shutdown().await.unwrap();

        assert!(gate.is_closed());
        assert!(storage.is_stopped());
    }

    #[tokio::test]
    async fn missing_storage_nodes_is_fatal() {
        let mut config = config();
        config.storage.nodes.clear();

        let err = Frontend::start(config).await.err().unwrap();
        assert!(matches!(
            err,
            LifecycleError::Start {
                subsystem: "storage nodes",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unusable_scratch_directory_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let mut config = config();
        config.cache_data_path = Some(file.to_string_lossy().into_owned());

        let err = Frontend::start(config).await.err().unwrap();
        assert!(matches!(
            err,
            LifecycleError::Start {
                subsystem: "scratch directory",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn taken_listen_address_is_fatal() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = config();
        config.server.listen_address = taken.local_addr().unwrap().to_string();

        let err = Frontend::start(config).await.err().unwrap();
        assert!(matches!(
            err,
            LifecycleError::Start {
                subsystem: "http listener",
                ..
            }
        ));
    }
}
