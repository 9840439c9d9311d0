//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives (past the root-path check)
//!     → queue.rs (derive max wait from `timeout` hint and config ceilings)
//!     → gate.rs (try slot; if full, wait up to max wait)
//!         → Slot: request proceeds to routing, slot freed on drop
//!         → TimedOut: 503 naming the limits to raise
//!         → Closed: 503, server is draining
//! ```
//!
//! # Design Decisions
//! - One gate instance, injected into the HTTP state (no globals)
//! - Overload shedding, not fair scheduling: late arrivals are shed first
//! - The wait timer is the only cancellation point; admitted requests run
//!   to completion

pub mod gate;
pub mod queue;

pub use gate::{AdmissionGate, Rejection, Slot};
pub use queue::QueuePolicy;
