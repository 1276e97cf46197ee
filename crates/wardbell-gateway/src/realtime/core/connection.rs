//! One live transport session and its read/write pump pair.
//!
//! - Read pump: read deadline reset on every inbound frame, inbound payloads
//!   are logged and otherwise ignored (the channel is push-only).
//! - Write pump: drains the outbound queue, coalescing whatever is already
//!   queued into a single flush, and pings at `ping_period`.
//!
//! Any failure on either side unregisters the connection. Unregistering drops
//! the queue sender, which is what tells the write pump to send a close frame
//! and stop.

use std::fmt;
use std::sync::Arc;

use axum::extract::ws::Message;
use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant, MissedTickBehavior};
use tracing::Instrument;

use wardbell_core::protocol::Subject;

use crate::realtime::core::registry::{ConnectionRegistry, Member};
use crate::realtime::types::{ConnectionId, ConnectionSettings, Lifecycle};
use crate::transport::codec::{frame_len, to_ws_message};

/// A connection built over an already-upgraded duplex transport, not yet registered.
pub struct Connection<S> {
    member: Member,
    pumps: Pumps<S>,
}

impl<S> Connection<S> {
    pub fn new(socket: S, subject: Subject, settings: &ConnectionSettings) -> Self {
        let (member, queue) = Member::channel(subject, settings.outbound_queue);
        let pumps = Pumps {
            id: member.id(),
            subject: member.subject().clone(),
            socket,
            queue,
            settings: settings.clone(),
            lifecycle: Lifecycle::new(),
        };
        Self { member, pumps }
    }

    pub fn id(&self) -> ConnectionId {
        self.member.id()
    }

    pub fn subject(&self) -> &Subject {
        self.member.subject()
    }

    pub(crate) fn into_parts(self) -> (Member, Pumps<S>) {
        (self.member, self.pumps)
    }
}

/// Socket side of a registered connection. Obtained from `ConnectionRegistry::register`.
pub struct Pumps<S> {
    id: ConnectionId,
    subject: Subject,
    socket: S,
    queue: mpsc::Receiver<Bytes>,
    settings: ConnectionSettings,
    lifecycle: Lifecycle,
}

enum WriteExit {
    QueueClosed,
    TimedOut,
    Failed(String),
}

impl<S> Pumps<S> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.clone()
    }
}

impl<S, E> Pumps<S>
where
    S: Stream<Item = Result<Message, E>> + Sink<Message, Error = E> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    /// Run both pumps until the connection is torn down.
    ///
    /// The write pump is spawned; the read pump runs on the calling task.
    pub async fn run(self, registry: Arc<ConnectionRegistry>) {
        let Pumps {
            id,
            subject,
            socket,
            queue,
            settings,
            lifecycle,
        } = self;

        let span = tracing::info_span!("conn", %id, role = %subject.role(), subject = %subject.key());
        async move {
            tracing::info!("connection open");
            let (sink, stream) = socket.split();

            let writer = tokio::spawn(
                write_pump(
                    sink,
                    queue,
                    settings.clone(),
                    lifecycle.clone(),
                    Arc::clone(&registry),
                    id,
                )
                .in_current_span(),
            );

            read_pump(stream, &settings, &lifecycle, &registry, id).await;

            if let Err(e) = writer.await {
                tracing::warn!(error = %e, "write pump task failed");
            }
            lifecycle.finish();
            tracing::info!("connection closed");
        }
        .instrument(span)
        .await
    }
}

async fn read_pump<R, E>(
    mut stream: R,
    settings: &ConnectionSettings,
    lifecycle: &Lifecycle,
    registry: &ConnectionRegistry,
    id: ConnectionId,
) where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    let mut deadline = Instant::now() + settings.pong_wait;

    loop {
        let next = tokio::select! {
            _ = lifecycle.closing() => break,
            next = timeout_at(deadline, stream.next()) => next,
        };

        let msg = match next {
            Err(_) => {
                tracing::info!("read deadline expired");
                break;
            }
            Ok(None) => {
                tracing::debug!("peer stream ended");
                break;
            }
            Ok(Some(Err(e))) => {
                tracing::debug!(error = %e, "read failed");
                break;
            }
            Ok(Some(Ok(msg))) => msg,
        };

        deadline = Instant::now() + settings.pong_wait;

        match msg {
            Message::Close(frame) => {
                tracing::debug!(?frame, "peer closed");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
            other => {
                let bytes = frame_len(&other);
                if bytes > settings.max_message_bytes {
                    tracing::warn!(bytes, limit = settings.max_message_bytes, "inbound frame too large");
                    break;
                }
                tracing::debug!(bytes, "inbound message ignored");
            }
        }
    }

    lifecycle.begin_close();
    registry.unregister(id);
}

async fn write_pump<W, E>(
    mut sink: W,
    mut queue: mpsc::Receiver<Bytes>,
    settings: ConnectionSettings,
    lifecycle: Lifecycle,
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
) where
    W: Sink<Message, Error = E> + Unpin,
    E: fmt::Display,
{
    let period = settings.ping_interval();
    let mut ping = tokio::time::interval_at(Instant::now() + period, period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let exit = loop {
        tokio::select! {
            maybe = queue.recv() => {
                let Some(first) = maybe else {
                    let _ = timeout(settings.write_wait, sink.send(Message::Close(None))).await;
                    break WriteExit::QueueClosed;
                };
                if let Err(exit) = write_batch(&mut sink, &mut queue, first, &settings).await {
                    break exit;
                }
            }
            _ = ping.tick() => {
                match timeout(settings.write_wait, sink.send(Message::Ping(Vec::new()))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => break WriteExit::Failed(e.to_string()),
                    Err(_) => break WriteExit::TimedOut,
                }
            }
        }
    };

    let metrics = registry.metrics();
    match exit {
        WriteExit::QueueClosed => tracing::debug!("outbound queue closed"),
        WriteExit::TimedOut => {
            metrics.write_failures.inc(&[("kind", "timeout")]);
            tracing::warn!("write deadline expired");
        }
        WriteExit::Failed(e) => {
            metrics.write_failures.inc(&[("kind", "error")]);
            tracing::debug!(error = %e, "write failed");
        }
    }

    lifecycle.begin_close();
    registry.unregister(id);
    let _ = timeout(settings.write_wait, sink.close()).await;
}

/// Write `first`, then everything already queued at this instant, in one flush.
async fn write_batch<W, E>(
    sink: &mut W,
    queue: &mut mpsc::Receiver<Bytes>,
    first: Bytes,
    settings: &ConnectionSettings,
) -> Result<(), WriteExit>
where
    W: Sink<Message, Error = E> + Unpin,
    E: fmt::Display,
{
    let batch = async {
        sink.feed(to_ws_message(first)).await?;
        for _ in 1..settings.outbound_queue {
            let Ok(next) = queue.try_recv() else { break };
            sink.feed(to_ws_message(next)).await?;
        }
        sink.flush().await
    };

    match timeout(settings.write_wait, batch).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(WriteExit::Failed(e.to_string())),
        Err(_) => Err(WriteExit::TimedOut),
    }
}
