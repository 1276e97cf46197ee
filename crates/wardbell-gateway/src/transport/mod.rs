//! Transport layer (WebSocket).
//!
//! Exposes the WS upgrade handler and the frame helpers used by the pumps.

pub mod codec;
pub mod ws;
