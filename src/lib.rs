//! Query front end for a distributed log-storage cluster.
//!
//! Accepts tenant-scoped HTTP queries, admits them through a process-wide
//! concurrency gate, routes them by path to query handlers, and coordinates
//! ordered startup and shutdown of the subsystems behind them.

pub mod admission;
pub mod config;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod scratch;
pub mod storage;

pub use admission::{AdmissionGate, QueuePolicy, Rejection};
pub use config::FrontendConfig;
pub use http::HttpServer;
pub use lifecycle::{Frontend, StartOptions};
