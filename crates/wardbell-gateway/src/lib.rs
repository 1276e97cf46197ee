//! Wardbell gateway library entry.
//!
//! Wires the connection registry, per-connection pumps, the notifier and the
//! HTTP surface (WebSocket upgrade, dispatch entry points, ops) into one
//! service. Consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod obs;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod transport;
