//! Frame helpers between queued payload bytes and WebSocket messages.

use axum::extract::ws::Message;
use bytes::Bytes;

/// Queued payloads are pre-serialized JSON; anything that is not UTF-8 goes
/// out as a binary frame instead of being rejected.
pub fn to_ws_message(payload: Bytes) -> Message {
    match String::from_utf8(payload.to_vec()) {
        Ok(text) => Message::Text(text),
        Err(e) => Message::Binary(e.into_bytes()),
    }
}

/// Payload length of a frame, for inbound size checks.
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) => v.len(),
        Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}
