use std::sync::Weak;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::realtime::core::registry::ConnectionRegistry;

/// Pending `send_to_all` frames before new broadcasts are dropped.
pub(crate) const BROADCAST_BACKLOG: usize = 1024;

/// Dedicated task serving global broadcasts, so a large fan-out never runs on
/// (or blocks) the caller's task.
///
/// Holds only a weak reference: when the registry is dropped its sender goes
/// with it and the loop ends.
pub struct BroadcastLoop {
    rx: mpsc::Receiver<Bytes>,
    registry: Weak<ConnectionRegistry>,
}

impl BroadcastLoop {
    pub(crate) fn new(rx: mpsc::Receiver<Bytes>, registry: Weak<ConnectionRegistry>) -> Self {
        Self { rx, registry }
    }

    pub async fn run(mut self) {
        while let Some(payload) = self.rx.recv().await {
            let Some(registry) = self.registry.upgrade() else { break };

            let started = Instant::now();
            let delivered = registry.fan_out_all(payload);
            registry
                .metrics()
                .broadcast_duration
                .observe(&[], started.elapsed());
            tracing::debug!(delivered, "broadcast fanned out");
        }
        tracing::debug!("broadcast loop stopped");
    }
}
