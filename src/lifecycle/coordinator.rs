//! Ordered subsystem start/stop.
//!
//! # Responsibilities
//! - Start subsystems one at a time, in the order the caller asks for
//! - Stop them in strict reverse order of their start
//! - Log each phase with its elapsed time
//!
//! # Design Decisions
//! - A failed start stops what already started, then reports the failure
//! - A failed stop aborts the shutdown: later (backend-facing) subsystems
//!   stay up rather than being torn down under live traffic

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot start {subsystem}: {source}")]
    Start {
        subsystem: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("cannot stop {subsystem}: {source}")]
    Stop {
        subsystem: &'static str,
        #[source]
        source: BoxError,
    },
}

/// A started component the coordinator knows how to stop.
#[async_trait]
pub trait Subsystem: Send + Sync {
    /// Stop the subsystem. Must not return while it is still in use.
    async fn stop(&self) -> Result<(), BoxError>;
}

/// Started subsystems, oldest first.
#[derive(Default)]
pub struct Lifecycle {
    started: Vec<(&'static str, Arc<dyn Subsystem>)>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `init` and register its result as the next started subsystem.
    ///
    /// If `init` fails, every subsystem started so far is stopped in
    /// reverse order before the error is returned.
    pub async fn start<S, F, E>(&mut self, name: &'static str, init: F) -> Result<Arc<S>, LifecycleError>
    where
        S: Subsystem + 'static,
        F: Future<Output = Result<S, E>>,
        E: Into<BoxError>,
    {
        let started_at = Instant::now();
        tracing::info!(subsystem = name, "Starting");

        match init.await {
            Ok(subsystem) => {
                let subsystem = Arc::new(subsystem);
                self.started.push((name, subsystem.clone() as Arc<dyn Subsystem>));
                tracing::info!(
                    subsystem = name,
                    elapsed_secs = started_at.elapsed().as_secs_f64(),
                    "Started"
                );
                Ok(subsystem)
            }
            Err(e) => {
                let source = e.into();
                tracing::error!(subsystem = name, error = %source, "Start failed");
                self.abort().await;
                Err(LifecycleError::Start {
                    subsystem: name,
                    source,
                })
            }
        }
    }

    /// Names of started subsystems, in start order.
    pub fn started(&self) -> Vec<&'static str> {
        self.started.iter().map(|(name, _)| *name).collect()
    }

    /// Stop every subsystem, newest first. Stops at the first failure.
    pub async fn shutdown(mut self) -> Result<(), LifecycleError> {
        let started_at = Instant::now();
        while let Some((name, subsystem)) = self.started.pop() {
            let phase = Instant::now();
            tracing::info!(subsystem = name, "Stopping");
            subsystem.stop().await.map_err(|source| {
                tracing::error!(subsystem = name, error = %source, "Stop failed");
                LifecycleError::Stop {
                    subsystem: name,
                    source,
                }
            })?;
            tracing::info!(
                subsystem = name,
                elapsed_secs = phase.elapsed().as_secs_f64(),
                "Stopped"
            );
        }
        tracing::info!(
            elapsed_secs = started_at.elapsed().as_secs_f64(),
            "Shutdown complete"
        );
        Ok(())
    }

    /// Best-effort reverse stop after a failed start.
    async fn abort(&mut self) {
        while let Some((name, subsystem)) = self.started.pop() {
            if let Err(e) = subsystem.stop().await {
                tracing::warn!(subsystem = name, error = %e, "Stop after failed start failed");
            }
        }
    }
}
