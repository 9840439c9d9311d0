//! The set of storage nodes and the shared client used to reach them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::StorageConfig;
use crate::storage::node::StorageNode;
use crate::storage::StorageError;

/// Connectivity to the storage tier.
///
/// Started first and stopped last among the request-path subsystems:
/// once [`StorageNodes::stop`] runs, every further [`StorageNodes::pick`]
/// fails with [`StorageError::Stopped`].
#[derive(Debug)]
pub struct StorageNodes {
    nodes: Vec<Arc<StorageNode>>,
    client: Client<HttpConnector, Body>,
    counter: AtomicUsize,
    stopped: AtomicBool,
    request_timeout: Duration,
    unhealthy_threshold: usize,
    healthy_threshold: usize,
}

impl StorageNodes {
    /// Build node handles from configuration. Fails without any nodes or on
    /// the first unparseable address.
    pub fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.nodes.is_empty() {
            return Err(StorageError::NoNodes);
        }
        let nodes = config
            .nodes
            .iter()
            .map(|addr| StorageNode::parse(addr).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(5)));
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            nodes,
            client,
            counter: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            unhealthy_threshold: config.unhealthy_threshold.max(1) as usize,
            healthy_threshold: config.healthy_threshold.max(1) as usize,
        })
    }

    /// Next node in round-robin order, skipping unhealthy ones.
    pub fn pick(&self) -> Result<Arc<StorageNode>, StorageError> {
        if self.is_stopped() {
            return Err(StorageError::Stopped);
        }

        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        let len = self.nodes.len();
        (0..len)
            .map(|i| &self.nodes[(start + i) % len])
            .find(|node| node.is_healthy())
            .cloned()
            .ok_or(StorageError::NoHealthyNodes)
    }

    /// Refuse all further use. Idempotent.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            let in_flight: usize = self.nodes.iter().map(|n| n.in_flight()).sum();
            if in_flight > 0 {
                tracing::warn!(in_flight, "Stopping storage connectivity with requests in flight");
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn nodes(&self) -> &[Arc<StorageNode>] {
        &self.nodes
    }

    pub fn client(&self) -> &Client<HttpConnector, Body> {
        &self.client
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn unhealthy_threshold(&self) -> usize {
        self.unhealthy_threshold
    }

    pub fn healthy_threshold(&self) -> usize {
        self.healthy_threshold
    }
}
