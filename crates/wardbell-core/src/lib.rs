//! Wardbell core: transport-agnostic notification primitives and error types.
//!
//! This crate defines the subject model (who a connection represents), the
//! JSON envelope pushed to clients, and the error surface shared by the
//! gateway. It carries no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `WardbellError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, WardbellError};
