//! Internal telemetry for the consultation core.
//!
//! Structured logging via `tracing`, a component health registry for the
//! daemon's startup probe, and in-memory counters the scheduler logs
//! periodically. No external metrics system.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
