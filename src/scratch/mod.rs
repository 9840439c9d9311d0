//! Scratch storage subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     cache_data_path → dir.rs (clear stale {path}/tmp, recreate)
//!
//! Runtime:
//!     cleaner.rs (periodic sweep of old files in {path}/tmp)
//!
//! Shutdown:
//!     cleaner stopped last, after storage connectivity
//! ```

pub mod cleaner;
pub mod dir;

use std::path::PathBuf;

use thiserror::Error;

pub use cleaner::ScratchCleaner;
pub use dir::ScratchDir;

#[derive(Debug, Error)]
pub enum ScratchError {
    #[error("cannot clear scratch directory {0:?}: {1}")]
    Clear(PathBuf, #[source] std::io::Error),
    #[error("cannot create scratch directory {0:?}: {1}")]
    Create(PathBuf, #[source] std::io::Error),
}
