use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

use wardbell_core::protocol::{Role, Subject};

use crate::obs::GatewayMetrics;
use crate::realtime::core::broadcast::{BroadcastLoop, BROADCAST_BACKLOG};
use crate::realtime::core::connection::{Connection, Pumps};
use crate::realtime::types::ConnectionId;

/// Registry-side half of a connection: identity plus the only queue sender.
///
/// Dropping a `Member` closes the connection's outbound queue.
#[derive(Debug)]
pub struct Member {
    id: ConnectionId,
    subject: Subject,
    tx: mpsc::Sender<Bytes>,
}

impl Member {
    /// Fresh identity and a bounded outbound queue.
    pub fn channel(subject: Subject, capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let member = Self {
            id: ConnectionId::next(),
            subject,
            tx,
        };
        (member, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }
}

/// One of the three lookup structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Users,
    Doctors,
    Admins,
}

impl Partition {
    fn of(role: Role) -> Self {
        match role {
            Role::Patient => Partition::Users,
            Role::Doctor => Partition::Doctors,
            Role::Admin => Partition::Admins,
        }
    }
}

/// Connection counts per partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub users: usize,
    pub doctors: usize,
    pub admins: usize,
}

impl RegistryStats {
    pub fn total(&self) -> usize {
        self.users + self.doctors + self.admins
    }
}

#[derive(Debug, Clone, Copy)]
enum Eviction {
    SlowConsumer,
    QueueClosed,
}

impl Eviction {
    fn label(self) -> &'static str {
        match self {
            Eviction::SlowConsumer => "slow_consumer",
            Eviction::QueueClosed => "queue_closed",
        }
    }
}

#[derive(Default)]
struct Partitions {
    users: HashMap<String, Vec<Member>>,
    doctors: HashMap<String, Vec<Member>>,
    admins: Vec<Member>,
    index: HashMap<ConnectionId, Subject>,
}

impl Partitions {
    fn slot(&self, subject: &Subject) -> Option<&Vec<Member>> {
        match Partition::of(subject.role()) {
            Partition::Users => self.users.get(subject.key()),
            Partition::Doctors => self.doctors.get(subject.key()),
            Partition::Admins => Some(&self.admins),
        }
    }

    fn insert(&mut self, member: Member) {
        self.index.insert(member.id, member.subject.clone());
        match Partition::of(member.subject.role()) {
            Partition::Users => self
                .users
                .entry(member.subject.key().to_string())
                .or_default()
                .push(member),
            Partition::Doctors => self
                .doctors
                .entry(member.subject.key().to_string())
                .or_default()
                .push(member),
            Partition::Admins => self.admins.push(member),
        }
    }

    /// Exact identity removal; siblings under the same key stay in place.
    fn remove(&mut self, id: ConnectionId) -> Option<Member> {
        let subject = self.index.remove(&id)?;
        let key = subject.key();
        match Partition::of(subject.role()) {
            Partition::Users => take_member(&mut self.users, key, id),
            Partition::Doctors => take_member(&mut self.doctors, key, id),
            Partition::Admins => {
                let pos = self.admins.iter().position(|m| m.id == id)?;
                Some(self.admins.remove(pos))
            }
        }
    }
}

fn take_member(map: &mut HashMap<String, Vec<Member>>, key: &str, id: ConnectionId) -> Option<Member> {
    let members = map.get_mut(key)?;
    let pos = members.iter().position(|m| m.id == id)?;
    let member = members.remove(pos);
    if members.is_empty() {
        map.remove(key);
    }
    Some(member)
}

/// Single source of truth for who is currently reachable.
///
/// Membership and every enumeration of a partition happen under one mutex.
/// Sends never block: a full queue drops the frame for that connection and
/// evicts it, siblings still get theirs.
pub struct ConnectionRegistry {
    partitions: Mutex<Partitions>,
    broadcast_tx: mpsc::Sender<Bytes>,
    metrics: Arc<GatewayMetrics>,
}

impl ConnectionRegistry {
    /// Build the registry and the loop that serves `send_to_all`.
    ///
    /// The loop must be driven (`tokio::spawn(lp.run())`) for broadcasts to go out.
    pub fn new(metrics: Arc<GatewayMetrics>) -> (Arc<Self>, BroadcastLoop) {
        let (broadcast_tx, broadcast_rx) = mpsc::channel(BROADCAST_BACKLOG);
        let registry = Arc::new(Self {
            partitions: Mutex::new(Partitions::default()),
            broadcast_tx,
            metrics,
        });
        let lp = BroadcastLoop::new(broadcast_rx, Arc::downgrade(&registry));
        (registry, lp)
    }

    /// `new` plus spawning the broadcast loop on the current runtime.
    pub fn start(metrics: Arc<GatewayMetrics>) -> Arc<Self> {
        let (registry, lp) = Self::new(metrics);
        tokio::spawn(lp.run());
        registry
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    fn lock(&self) -> MutexGuard<'_, Partitions> {
        self.partitions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a freshly built connection and hand back its pumps.
    pub fn register<S>(&self, conn: Connection<S>) -> Pumps<S> {
        let (member, pumps) = conn.into_parts();
        self.insert(member);
        pumps
    }

    /// Register the registry-side half directly.
    pub fn insert(&self, member: Member) {
        let id = member.id;
        let role = member.subject.role();
        tracing::debug!(conn = %id, subject = %member.subject, "connection registered");
        self.lock().insert(member);
        self.metrics.connections_active.inc(&[("role", role.as_str())]);
    }

    /// Remove by identity and close the outbound queue. Idempotent.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.lock().remove(id);
        match removed {
            Some(member) => {
                self.metrics
                    .connections_active
                    .dec(&[("role", member.subject.role().as_str())]);
                tracing::debug!(conn = %id, subject = %member.subject, "connection unregistered");
                // `member` drops here, closing the queue.
                true
            }
            None => false,
        }
    }

    /// Enqueue on every connection of a patient. Returns how many accepted it.
    pub fn send_to_user(&self, user_code: &str, payload: Bytes) -> usize {
        self.send_to_subject(&Subject::patient(user_code), payload)
    }

    pub fn send_to_doctor(&self, doctor_code: &str, payload: Bytes) -> usize {
        self.send_to_subject(&Subject::doctor(doctor_code), payload)
    }

    pub fn send_to_admin(&self, payload: Bytes) -> usize {
        self.send_to_subject(&Subject::admin(), payload)
    }

    /// Queue a global broadcast for the broadcast loop. Returns false when the
    /// backlog is full and the frame was dropped.
    pub fn send_to_all(&self, payload: Bytes) -> bool {
        match self.broadcast_tx.try_send(payload) {
            Ok(()) => true,
            Err(e) => {
                self.metrics.frames_dropped.inc(&[("reason", "broadcast_backlog")]);
                tracing::warn!(error = %e, "broadcast dropped");
                false
            }
        }
    }

    fn send_to_subject(&self, subject: &Subject, payload: Bytes) -> usize {
        let label = subject.role().as_str();
        let mut delivered = 0;
        let mut stale = Vec::new();

        let evicted = {
            let mut partitions = self.lock();
            if let Some(members) = partitions.slot(subject) {
                for m in members {
                    match m.tx.try_send(payload.clone()) {
                        Ok(()) => delivered += 1,
                        Err(TrySendError::Full(_)) => stale.push((m.id, Eviction::SlowConsumer)),
                        Err(TrySendError::Closed(_)) => stale.push((m.id, Eviction::QueueClosed)),
                    }
                }
            }
            stale
                .into_iter()
                .filter_map(|(id, why)| partitions.remove(id).map(|m| (m, why)))
                .collect::<Vec<_>>()
        };

        self.metrics.frames_enqueued.add(&[("target", label)], delivered as u64);
        self.record_evictions(evicted);
        delivered
    }

    /// Fan a broadcast out to every live connection. The lock is held only
    /// while the queue senders are snapshotted.
    pub(crate) fn fan_out_all(&self, payload: Bytes) -> usize {
        let targets: Vec<(ConnectionId, mpsc::Sender<Bytes>)> = {
            let partitions = self.lock();
            partitions
                .users
                .values()
                .chain(partitions.doctors.values())
                .flatten()
                .chain(partitions.admins.iter())
                .map(|m| (m.id, m.tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut stale = Vec::new();
        for (id, tx) in targets {
            match tx.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => stale.push((id, Eviction::SlowConsumer)),
                Err(TrySendError::Closed(_)) => stale.push((id, Eviction::QueueClosed)),
            }
        }

        self.metrics.frames_enqueued.add(&[("target", "all")], delivered as u64);
        if !stale.is_empty() {
            let evicted = {
                let mut partitions = self.lock();
                stale
                    .into_iter()
                    .filter_map(|(id, why)| partitions.remove(id).map(|m| (m, why)))
                    .collect::<Vec<_>>()
            };
            self.record_evictions(evicted);
        }
        delivered
    }

    fn record_evictions(&self, evicted: Vec<(Member, Eviction)>) {
        for (member, why) in evicted {
            let reason = why.label();
            if matches!(why, Eviction::SlowConsumer) {
                self.metrics.frames_dropped.inc(&[("reason", "queue_full")]);
            } else {
                self.metrics.frames_dropped.inc(&[("reason", "queue_closed")]);
            }
            self.metrics.evictions.inc(&[("reason", reason)]);
            self.metrics
                .connections_active
                .dec(&[("role", member.subject.role().as_str())]);
            tracing::warn!(conn = %member.id, subject = %member.subject, reason, "connection evicted");
        }
    }

    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.lock().index.contains_key(&id)
    }

    /// Every partition slot holding `id`, found by scanning rather than the index.
    pub fn placements(&self, id: ConnectionId) -> Vec<Partition> {
        let partitions = self.lock();
        let mut found = Vec::new();
        for members in partitions.users.values() {
            found.extend(members.iter().filter(|m| m.id == id).map(|_| Partition::Users));
        }
        for members in partitions.doctors.values() {
            found.extend(members.iter().filter(|m| m.id == id).map(|_| Partition::Doctors));
        }
        found.extend(partitions.admins.iter().filter(|m| m.id == id).map(|_| Partition::Admins));
        found
    }

    pub fn partition_of(&self, id: ConnectionId) -> Option<Partition> {
        self.lock()
            .index
            .get(&id)
            .map(|subject| Partition::of(subject.role()))
    }

    pub fn connection_count(&self, subject: &Subject) -> usize {
        self.lock().slot(subject).map(Vec::len).unwrap_or(0)
    }

    pub fn stats(&self) -> RegistryStats {
        let partitions = self.lock();
        RegistryStats {
            users: partitions.users.values().map(Vec::len).sum(),
            doctors: partitions.doctors.values().map(Vec::len).sum(),
            admins: partitions.admins.len(),
        }
    }
}
