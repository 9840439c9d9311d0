//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     scratch cleaner → storage nodes → scratch directory
//!         → admission gate → HTTP listener
//!
//! Shutdown (coordinator.rs, reverse order):
//!     listener drains (gate refuses new admissions, in-flight finish)
//!         → gate closed → scratch directory → storage nodes → cleaner
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Frontend::shutdown
//! ```
//!
//! # Design Decisions
//! - Listener starts last and stops first
//! - No forced kill of in-flight requests; the supervisor owns hard deadlines
//! - A listener that fails to stop aborts shutdown before storage is touched

pub mod coordinator;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use coordinator::{Lifecycle, LifecycleError, Subsystem};
pub use shutdown::Shutdown;
pub use signals::wait_for_termination;
pub use startup::{Frontend, StartOptions};
