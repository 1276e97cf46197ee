//! Registry membership and routing tests against raw outbound queues.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::json;
use tokio::sync::mpsc::{self, error::TryRecvError};

use wardbell_core::protocol::{Envelope, Subject};
use wardbell_gateway::obs::GatewayMetrics;
use wardbell_gateway::realtime::{ConnectionId, ConnectionRegistry, Member, Partition, RegistryStats};

fn registry() -> Arc<ConnectionRegistry> {
    ConnectionRegistry::start(Arc::new(GatewayMetrics::default()))
}

fn join(reg: &ConnectionRegistry, subject: Subject, capacity: usize) -> (ConnectionId, mpsc::Receiver<Bytes>) {
    let (member, rx) = Member::channel(subject, capacity);
    let id = member.id();
    reg.insert(member);
    (id, rx)
}

fn frame(kind: &str) -> Bytes {
    Envelope::new(kind, json!({})).encode().unwrap()
}

#[tokio::test]
async fn targeted_delivery_scenario() {
    let reg = registry();
    let (a, mut ra) = join(&reg, Subject::patient("U1"), 8);

    let ping = Envelope::new("ping", serde_json::Value::Null).encode().unwrap();
    assert_eq!(reg.send_to_user("U1", ping.clone()), 1);
    assert_eq!(ra.try_recv().unwrap(), ping);
    assert!(matches!(ra.try_recv(), Err(TryRecvError::Empty)));

    let (_b, mut rb) = join(&reg, Subject::doctor("D1"), 8);
    let (_c, mut rc) = join(&reg, Subject::admin(), 8);

    let x = frame("x");
    assert_eq!(reg.send_to_admin(x.clone()), 1);
    assert_eq!(rc.try_recv().unwrap(), x);
    assert!(ra.try_recv().is_err());
    assert!(rb.try_recv().is_err());

    assert!(reg.unregister(a));
    assert_eq!(reg.send_to_user("U1", frame("late")), 0);
    assert!(matches!(ra.try_recv(), Err(TryRecvError::Disconnected)));
}

#[tokio::test]
async fn every_connection_sits_in_exactly_one_partition() {
    let reg = registry();
    let mut expected = Vec::new();

    for i in 0..12 {
        let (subject, partition) = match i % 3 {
            0 => (Subject::patient(format!("U{}", i % 4)), Partition::Users),
            1 => (Subject::doctor(format!("D{}", i % 4)), Partition::Doctors),
            _ => (Subject::admin(), Partition::Admins),
        };
        let (id, rx) = join(&reg, subject, 4);
        expected.push((id, partition, rx));
    }

    for (id, partition, _) in &expected {
        assert_eq!(reg.placements(*id), vec![*partition]);
        assert_eq!(reg.partition_of(*id), Some(*partition));
    }
    assert_eq!(
        reg.stats(),
        RegistryStats {
            users: 4,
            doctors: 4,
            admins: 4
        }
    );

    for (id, _, _) in expected.iter().step_by(2) {
        reg.unregister(*id);
    }
    for (i, (id, partition, _)) in expected.iter().enumerate() {
        if i % 2 == 0 {
            assert!(reg.placements(*id).is_empty());
        } else {
            assert_eq!(reg.placements(*id), vec![*partition]);
        }
    }
    assert_eq!(reg.stats().total(), 6);
}

#[tokio::test]
async fn unregister_is_idempotent() {
    let reg = registry();
    let (id, _rx) = join(&reg, Subject::doctor("D1"), 4);
    let (_other, _rx2) = join(&reg, Subject::doctor("D1"), 4);

    assert!(reg.unregister(id));
    let after_first = reg.stats();
    assert!(!reg.unregister(id));
    assert_eq!(reg.stats(), after_first);

    let (never, _rx3) = Member::channel(Subject::admin(), 4);
    assert!(!reg.unregister(never.id()));
    assert_eq!(reg.stats(), after_first);
}

#[tokio::test]
async fn siblings_survive_each_other() {
    let reg = registry();
    let (c1, _r1) = join(&reg, Subject::patient("U1"), 4);
    let (c2, mut r2) = join(&reg, Subject::patient("U1"), 4);
    assert_eq!(reg.connection_count(&Subject::patient("U1")), 2);

    reg.unregister(c1);
    assert!(reg.is_registered(c2));
    assert_eq!(reg.send_to_user("U1", frame("still-here")), 1);
    assert_eq!(r2.try_recv().unwrap(), frame("still-here"));
}

#[tokio::test]
async fn routing_miss_is_silent() {
    let reg = registry();
    assert_eq!(reg.send_to_user("no-such-code", frame("x")), 0);
    assert_eq!(reg.send_to_doctor("no-such-code", frame("x")), 0);
    assert_eq!(reg.send_to_admin(frame("x")), 0);
}

#[tokio::test]
async fn queue_preserves_enqueue_order() {
    let reg = registry();
    let (_id, mut rx) = join(&reg, Subject::doctor("D7"), 8);
    for k in ["m1", "m2", "m3"] {
        reg.send_to_doctor("D7", frame(k));
    }
    for k in ["m1", "m2", "m3"] {
        assert_eq!(rx.recv().await.unwrap(), frame(k));
    }
}

#[tokio::test]
async fn slow_consumer_is_evicted_without_starving_siblings() {
    let reg = registry();
    let (slow, mut slow_rx) = join(&reg, Subject::patient("U1"), 1);
    let (fast, mut fast_rx) = join(&reg, Subject::patient("U1"), 8);

    assert_eq!(reg.send_to_user("U1", frame("first")), 2);
    assert_eq!(reg.send_to_user("U1", frame("second")), 1);

    assert!(!reg.is_registered(slow));
    assert!(reg.is_registered(fast));
    assert_eq!(fast_rx.try_recv().unwrap(), frame("first"));
    assert_eq!(fast_rx.try_recv().unwrap(), frame("second"));

    // Buffered frame still drains, then the queue reports closed.
    assert_eq!(slow_rx.try_recv().unwrap(), frame("first"));
    assert!(matches!(slow_rx.try_recv(), Err(TryRecvError::Disconnected)));

    let m = reg.metrics();
    assert_eq!(m.evictions.get(&[("reason", "slow_consumer")]), 1);
    assert_eq!(m.frames_dropped.get(&[("reason", "queue_full")]), 1);
    assert_eq!(m.connections_active.get(&[("role", "user")]), 1);
}

#[tokio::test]
async fn broadcast_reaches_every_partition() {
    let reg = registry();
    let (_u, mut ru) = join(&reg, Subject::patient("U1"), 4);
    let (_d, mut rd) = join(&reg, Subject::doctor("D1"), 4);
    let (_a, mut ra) = join(&reg, Subject::admin(), 4);

    assert!(reg.send_to_all(frame("maintenance")));

    for rx in [&mut ru, &mut rd, &mut ra] {
        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(got.unwrap(), frame("maintenance"));
    }
    assert_eq!(reg.metrics().frames_enqueued.get(&[("target", "all")]), 3);
}

#[tokio::test]
async fn broadcast_evicts_full_queues() {
    let reg = registry();
    let (stuck, _stuck_rx) = join(&reg, Subject::doctor("D1"), 1);
    let (_ok, mut ok_rx) = join(&reg, Subject::doctor("D2"), 4);

    reg.send_to_doctor("D1", frame("fill"));
    reg.send_to_all(frame("all"));

    let got = tokio::time::timeout(Duration::from_secs(1), ok_rx.recv()).await.unwrap();
    assert_eq!(got.unwrap(), frame("all"));

    tokio::time::timeout(Duration::from_secs(1), async {
        while reg.is_registered(stuck) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("stuck connection should be evicted");
}
