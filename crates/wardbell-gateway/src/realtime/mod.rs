//! Realtime runtime (egress engine) for the Wardbell gateway.
//!
//! Connection registry, broadcast loop, per-connection pumps and the notifier
//! used by dispatch entry points.

pub mod core;
pub mod types;

pub use core::{
    BroadcastLoop, Connection, ConnectionRegistry, Member, Notifier, Partition, Pumps,
    RegistryStats,
};
pub use types::{ConnState, ConnectionId, ConnectionSettings, Lifecycle, Target, MIN_KEEPALIVE};
