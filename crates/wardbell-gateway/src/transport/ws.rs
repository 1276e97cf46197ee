//! WebSocket upgrade handler.
//!
//! - Resolve `?token=` to a subject before upgrading (401 otherwise)
//! - Cap inbound message size at the upgrade
//! - Register the connection and run its pumps on the upgrade task

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use wardbell_core::protocol::Subject;

use crate::app_state::AppState;
use crate::error::HttpError;
use crate::realtime::Connection;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    Query(q): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    if app.is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, "draining").into_response();
    }

    let subject = match app.authenticator().authenticate(&q.token).await {
        Ok(s) => s,
        Err(e) => {
            app.metrics().ws_upgrades.inc(&[("result", "rejected")]);
            tracing::debug!(error = %e, "handshake rejected");
            return HttpError::from(e).into_response();
        }
    };
    app.metrics().ws_upgrades.inc(&[("result", "accepted")]);

    let max = app.settings().max_message_bytes;
    ws.max_message_size(max)
        .max_frame_size(max)
        .on_upgrade(move |socket| run_session(app, subject, socket))
}

async fn run_session(app: AppState, subject: Subject, socket: WebSocket) {
    let conn = Connection::new(socket, subject, app.settings());
    let registry = app.registry();
    let pumps = registry.register(conn);
    pumps.run(registry).await;
}
