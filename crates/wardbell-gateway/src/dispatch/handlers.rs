use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use wardbell_core::error::WardbellError;
use wardbell_core::protocol::Envelope;

use crate::app_state::AppState;
use crate::context::DispatchCaller;
use crate::dispatch::events::AppointmentEvent;
use crate::error::HttpError;
use crate::realtime::Target;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyRequest {
    /// `user` | `patient` | `doctor` | `admin` | `all`
    pub target: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Value,
}

/// `POST /v1/notify`
pub async fn notify(
    State(app): State<AppState>,
    DispatchCaller(caller): DispatchCaller,
    Json(req): Json<NotifyRequest>,
) -> Result<(StatusCode, Json<Value>), HttpError> {
    let target = Target::parse(&req.target, req.code.as_deref())?;
    if req.kind.is_empty() {
        return Err(WardbellError::BadRequest("type must not be empty".into()).into());
    }
    let env = Envelope::new(req.kind, req.content);

    let delivered = app.notifier().notify(&target, &env);
    tracing::debug!(caller = %caller, %target, delivered, "notify dispatched");
    Ok((StatusCode::ACCEPTED, Json(json!({ "delivered": delivered }))))
}

/// `POST /v1/events/appointments`
pub async fn appointment_event(
    State(app): State<AppState>,
    DispatchCaller(caller): DispatchCaller,
    Json(ev): Json<AppointmentEvent>,
) -> Result<(StatusCode, Json<Value>), HttpError> {
    let (env, targets) = ev.deliveries()?;
    let delivered = app.notifier().notify_many(&targets, &env);
    tracing::info!(
        caller = %caller,
        event = ?ev.event,
        appointment = %ev.appointment.appointment_id,
        delivered,
        "appointment event dispatched"
    );
    Ok((StatusCode::ACCEPTED, Json(json!({ "delivered": delivered }))))
}
