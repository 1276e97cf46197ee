//! Top-level facade crate for Wardbell.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use wardbell_core::*;
}

pub mod gateway {
    pub use wardbell_gateway::*;
}
