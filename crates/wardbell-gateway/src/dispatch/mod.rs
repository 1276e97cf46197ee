//! Dispatch entry points: HTTP handlers that turn domain events into
//! notifications and hand them to the notifier. Callers authenticate with an
//! admin bearer token (`DispatchCaller`).
//!
//! Delivery is best-effort, so these handlers answer 202 whether or not any
//! subject is currently connected.

pub mod events;
pub mod handlers;

pub use events::{AppointmentEvent, AppointmentEventKind, AppointmentNotice};
pub use handlers::{appointment_event, notify, NotifyRequest};
