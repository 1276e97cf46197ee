//! In-memory duplex transport standing in for an upgraded WebSocket.

#![allow(dead_code)]

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::ws::Message;
use futures_util::{Sink, Stream};
use tokio::sync::mpsc;

#[derive(Debug)]
pub struct FakeError(pub &'static str);

impl fmt::Display for FakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Server side of the fake socket.
pub struct FakeSocket {
    inbound: mpsc::UnboundedReceiver<Result<Message, FakeError>>,
    outbound: mpsc::UnboundedSender<Message>,
    fail_writes: bool,
    stall_writes: bool,
    flushes: Arc<AtomicUsize>,
}

/// Client side: what the remote peer sends and sees.
pub struct Peer {
    pub to_server: mpsc::UnboundedSender<Result<Message, FakeError>>,
    pub from_server: mpsc::UnboundedReceiver<Message>,
    pub flushes: Arc<AtomicUsize>,
}

pub fn pair() -> (FakeSocket, Peer) {
    let (to_server, inbound) = mpsc::unbounded_channel();
    let (outbound, from_server) = mpsc::unbounded_channel();
    let flushes = Arc::new(AtomicUsize::new(0));
    (
        FakeSocket {
            inbound,
            outbound,
            fail_writes: false,
            stall_writes: false,
            flushes: Arc::clone(&flushes),
        },
        Peer {
            to_server,
            from_server,
            flushes,
        },
    )
}

/// A socket whose every write fails.
pub fn broken_pair() -> (FakeSocket, Peer) {
    let (mut socket, peer) = pair();
    socket.fail_writes = true;
    (socket, peer)
}

/// A socket that never becomes writable, like a peer with a full TCP window.
pub fn stalled_pair() -> (FakeSocket, Peer) {
    let (mut socket, peer) = pair();
    socket.stall_writes = true;
    (socket, peer)
}

impl Peer {
    /// Next frame from the server, or `None` after `wait`.
    pub async fn next_frame(&mut self, wait: Duration) -> Option<Message> {
        tokio::time::timeout(wait, self.from_server.recv()).await.ok().flatten()
    }

    /// Next non-ping frame.
    pub async fn next_data(&mut self, wait: Duration) -> Option<Message> {
        loop {
            match self.next_frame(wait).await? {
                Message::Ping(_) => continue,
                other => return Some(other),
            }
        }
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl Stream for FakeSocket {
    type Item = Result<Message, FakeError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inbound.poll_recv(cx)
    }
}

impl Sink<Message> for FakeSocket {
    type Error = FakeError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.stall_writes {
            return Poll::Pending;
        }
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
        let this = self.get_mut();
        if this.fail_writes {
            return Err(FakeError("write refused"));
        }
        this.outbound.send(item).map_err(|_| FakeError("peer gone"))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.stall_writes {
            return Poll::Pending;
        }
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.stall_writes {
            return Poll::Pending;
        }
        Poll::Ready(Ok(()))
    }
}

pub fn text(msg: &Message) -> &str {
    match msg {
        Message::Text(s) => s,
        other => panic!("expected text frame, got {other:?}"),
    }
}
