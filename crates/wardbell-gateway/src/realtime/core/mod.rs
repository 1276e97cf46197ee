//! Realtime core components.
//!
//! The registry owns every live connection's queue sender; the pumps own the
//! socket; the notifier encodes envelopes once and routes them.

mod broadcast;
mod connection;
mod notifier;
mod registry;

pub use broadcast::BroadcastLoop;
pub use connection::{Connection, Pumps};
pub use notifier::Notifier;
pub use registry::{ConnectionRegistry, Member, Partition, RegistryStats};
