//! Lightweight in-process metrics.
//!
//! Prometheus-compatible text rendering without an exporter crate. Values
//! live in atomics and are rendered by the `/metrics` handler.

pub mod metrics;

pub use metrics::GatewayMetrics;
