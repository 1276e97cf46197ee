//! Notification protocol primitives.
//!
//! - `subject`: who a connection represents (role + business code).
//! - `envelope`: the `{ "type", "content" }` JSON document pushed to clients.
//!
//! The gateway treats `content` as opaque; it serializes an envelope once and
//! forwards the same bytes to every targeted connection.

pub mod envelope;
pub mod subject;

pub use envelope::{kind, Envelope};
pub use subject::{Role, Subject};
