//! A single storage node.
//!
//! # Responsibilities
//! - Hold the node's base URL
//! - Track passive health from request outcomes
//! - Count requests currently in flight to the node

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use url::Url;

use crate::observability::metrics;
use crate::storage::StorageError;

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

#[derive(Debug)]
pub struct StorageNode {
    /// Address as configured, for logs and metrics.
    pub addr: String,
    pub base_url: Url,
    in_flight: AtomicUsize,
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
    consecutive_successes: AtomicUsize,
}

impl StorageNode {
    /// Accepts `host:port` or a full `http(s)://` URL.
    pub fn parse(addr: &str) -> Result<Self, StorageError> {
        let trimmed = addr.trim();
        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };
        let base_url = Url::parse(&candidate)
            .map_err(|e| StorageError::InvalidAddress(addr.to_string(), e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.host().is_none() {
            return Err(StorageError::InvalidAddress(
                addr.to_string(),
                "expected an http(s) host".to_string(),
            ));
        }
        Ok(Self {
            addr: trimmed.to_string(),
            base_url,
            in_flight: AtomicUsize::new(0),
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
        })
    }

    pub fn state(&self) -> HealthState {
        self.state.load(Ordering::Relaxed).into()
    }

    /// Healthy or not yet known.
    pub fn is_healthy(&self) -> bool {
        self.state() != HealthState::Unhealthy
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub(crate) fn begin(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn end(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    /// Report a successful request.
    pub fn mark_success(&self, healthy_threshold: usize) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        if self.state() == HealthState::Healthy {
            return;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= healthy_threshold {
            self.state.store(HealthState::Healthy as u8, Ordering::Relaxed);
            tracing::info!(addr = %self.addr, "Storage node marked healthy");
            metrics::record_storage_health(&self.addr, true);
        }
    }

    /// Report a failed request.
    pub fn mark_failure(&self, unhealthy_threshold: usize) {
        self.consecutive_successes.store(0, Ordering::Relaxed);
        if self.state() == HealthState::Unhealthy {
            return;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= unhealthy_threshold {
            self.state.store(HealthState::Unhealthy as u8, Ordering::Relaxed);
            tracing::warn!(addr = %self.addr, failures, "Storage node marked unhealthy");
            metrics::record_storage_health(&self.addr, false);
        }
    }
}
