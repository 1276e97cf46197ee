use std::sync::Arc;

use bytes::Bytes;

use wardbell_core::protocol::Envelope;

use crate::realtime::core::registry::ConnectionRegistry;
use crate::realtime::types::Target;

/// Egress entry point for domain-event handlers.
///
/// Encodes an envelope once and routes the bytes. Never fails the caller: an
/// encode error is logged and the notification is dropped.
#[derive(Clone)]
pub struct Notifier {
    registry: Arc<ConnectionRegistry>,
}

impl Notifier {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the number of connections the frame was enqueued on
    /// synchronously; broadcasts report 0 and complete on the broadcast loop.
    pub fn notify(&self, target: &Target, env: &Envelope) -> usize {
        self.notify_many(std::slice::from_ref(target), env)
    }

    /// Encode once, route to every target.
    pub fn notify_many(&self, targets: &[Target], env: &Envelope) -> usize {
        let payload = match env.encode() {
            Ok(p) => p,
            Err(e) => {
                self.registry.metrics().frames_dropped.inc(&[("reason", "encode")]);
                tracing::warn!(kind = %env.kind, error = %e, "notification dropped");
                return 0;
            }
        };

        let mut delivered = 0;
        for target in targets {
            let n = self.route(target, payload.clone());
            tracing::debug!(%target, kind = %env.kind, delivered = n, "notification routed");
            delivered += n;
        }
        delivered
    }

    fn route(&self, target: &Target, payload: Bytes) -> usize {
        match target {
            Target::User(code) => self.registry.send_to_user(code, payload),
            Target::Doctor(code) => self.registry.send_to_doctor(code, payload),
            Target::Admins => self.registry.send_to_admin(payload),
            Target::All => {
                self.registry.send_to_all(payload);
                0
            }
        }
    }
}
