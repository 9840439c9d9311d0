//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted request (path)
//!     → path.rs (collapse `//`, split prefix / tenant / suffix, parse token)
//!     → table.rs (family by prefix, then route by suffix)
//!     → router.rs (invoke handler, count, render errors)
//!     → Return: Handled | NotFound | NotMine | BadPath
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (exact and literal-sandwich matching only)
//! - Deterministic: same input always matches same route
//! - First match wins; the table is kept free of overlaps

pub mod path;
pub mod router;
pub mod table;

pub use path::{ParsedPath, PathError, TenantToken};
pub use router::{Dispatch, Router};
pub use table::{Family, Route, RoutePattern, RouteTable};
