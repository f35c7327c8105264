//! HTTP server for the event bracket engine.
//!
//! - [`api`]: Axum router and handlers
//! - [`config`]: Validated server configuration
//! - [`logging`]: Tracing subscriber setup
//! - [`metrics`]: Prometheus counters

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
