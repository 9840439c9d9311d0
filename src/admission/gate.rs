//! Bounded concurrency gate with a timed wait path.
//!
//! # Responsibilities
//! - Admit at most `capacity` concurrent query handlers
//! - Queue callers behind a timer when full instead of rejecting outright
//! - Count queued and timed-out acquisitions
//! - Refuse new acquisitions once draining, and everything once closed
//!
//! # Design Decisions
//! - Backed by a Tokio semaphore; the permit lives inside [`Slot`], so a
//!   handler that errors or panics still frees its slot on drop
//! - No fairness promise between waiters beyond "a freed slot wakes a waiter"
//! - A timeout is a normal outcome ([`Rejection::TimedOut`]), not a fault

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::observability::metrics;

/// Why an acquisition did not produce a slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Every slot stayed occupied for the whole wait.
    #[error("cannot handle more than {capacity} concurrent search requests during {waited:?}")]
    TimedOut { capacity: usize, waited: Duration },
    /// The gate is draining or closed for shutdown.
    #[error("the server is shutting down")]
    Closed,
}

#[derive(Debug)]
struct GateInner {
    permits: Arc<Semaphore>,
    capacity: usize,
    draining: AtomicBool,
    limit_reached: AtomicU64,
    limit_timeout: AtomicU64,
}

impl GateInner {
    fn occupied(&self) -> usize {
        self.capacity
            .saturating_sub(self.permits.available_permits())
    }

    fn publish(&self) {
        metrics::record_occupancy(self.capacity, self.occupied());
    }
}

/// Process-wide admission gate. Cheap to clone; clones share the same slots.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots.
    ///
    /// # Panics
    /// Panics if `capacity` is zero or above `Semaphore::MAX_PERMITS`; config
    /// validation rejects both earlier.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "admission capacity must be positive");
        let inner = GateInner {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            draining: AtomicBool::new(false),
            limit_reached: AtomicU64::new(0),
            limit_timeout: AtomicU64::new(0),
        };
        inner.publish();
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Obtain a slot, waiting at most `max_wait` when the gate is full.
    ///
    /// A zero `max_wait` on a full gate returns [`Rejection::TimedOut`]
    /// without blocking.
    pub async fn acquire(&self, max_wait: Duration) -> Result<Slot, Rejection> {
        if self.inner.draining.load(Ordering::SeqCst) {
            return Err(Rejection::Closed);
        }
        match self.inner.permits.clone().try_acquire_owned() {
            Ok(permit) => return Ok(self.slot(permit)),
            Err(TryAcquireError::Closed) => return Err(Rejection::Closed),
            Err(TryAcquireError::NoPermits) => {}
        }

        self.inner.limit_reached.fetch_add(1, Ordering::Relaxed);
        metrics::record_limit_reached();

        let waiting = self.inner.permits.clone().acquire_owned();
        match tokio::time::timeout(max_wait, waiting).await {
            Ok(Ok(permit)) => Ok(self.slot(permit)),
            Ok(Err(_)) => Err(Rejection::Closed),
            Err(_) => {
                self.inner.limit_timeout.fetch_add(1, Ordering::Relaxed);
                metrics::record_limit_timeout();
                Err(Rejection::TimedOut {
                    capacity: self.inner.capacity,
                    waited: max_wait,
                })
            }
        }
    }

    fn slot(&self, permit: OwnedSemaphorePermit) -> Slot {
        self.inner.publish();
        Slot {
            permit: Some(permit),
            gate: Arc::clone(&self.inner),
        }
    }

    /// Refuse acquisitions that start from now on. Callers already queued
    /// keep waiting and may still be admitted.
    pub fn drain(&self) {
        if !self.inner.draining.swap(true, Ordering::SeqCst) {
            tracing::debug!(occupied = self.occupied(), "Admission gate draining");
        }
    }

    /// Stop admitting entirely. Current holders keep their slots; queued
    /// and future callers get [`Rejection::Closed`].
    pub fn close(&self) {
        self.inner.draining.store(true, Ordering::SeqCst);
        self.inner.permits.close();
        tracing::debug!(occupied = self.occupied(), "Admission gate closed");
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.permits.is_closed()
    }

    /// Configured slot count.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Slots currently held.
    pub fn occupied(&self) -> usize {
        self.inner.occupied()
    }

    /// Acquisitions that did not succeed immediately.
    pub fn limit_reached_count(&self) -> u64 {
        self.inner.limit_reached.load(Ordering::Relaxed)
    }

    /// Acquisitions that gave up after waiting.
    pub fn limit_timeout_count(&self) -> u64 {
        self.inner.limit_timeout.load(Ordering::Relaxed)
    }
}

/// One unit of admitted concurrency. Released exactly once, on drop.
#[derive(Debug)]
#[must_use = "dropping a slot releases it immediately"]
pub struct Slot {
    permit: Option<OwnedSemaphorePermit>,
    gate: Arc<GateInner>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        drop(self.permit.take());
        self.gate.publish();
    }
}
