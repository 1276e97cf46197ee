//! Connection and caller context resolved before a request is served.

pub mod caller;
pub mod identity;

pub use caller::DispatchCaller;
pub use identity::{Authenticator, StaticTokens};
