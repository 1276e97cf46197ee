//! Axum router wiring.
//!
//! - `/ws` : WebSocket upgrade
//! - `/v1/notify`, `/v1/events/appointments` : dispatch entry points
//! - `/healthz`, `/readyz`, `/metrics` : ops

use axum::{
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, dispatch, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(transport::ws::ws_upgrade))
        .route("/v1/notify", post(dispatch::notify))
        .route("/v1/events/appointments", post(dispatch::appointment_event))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
