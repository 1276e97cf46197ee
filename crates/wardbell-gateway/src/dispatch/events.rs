use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use wardbell_core::error::{Result, WardbellError};
use wardbell_core::protocol::{kind, Envelope};

use crate::realtime::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentEventKind {
    Created,
    Cancelled,
    StatusChanged,
}

/// Appointment fields the client needs; anything extra is forwarded as is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentNotice {
    pub appointment_id: String,
    pub user_code: String,
    pub doctor_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppointmentEvent {
    pub event: AppointmentEventKind,
    pub appointment: AppointmentNotice,
}

impl AppointmentEvent {
    /// Envelope plus recipients:
    /// - created: doctor and admins
    /// - cancelled: patient, doctor and admins
    /// - status changed: patient
    pub fn deliveries(&self) -> Result<(Envelope, Vec<Target>)> {
        let a = &self.appointment;
        if a.appointment_id.is_empty() || a.user_code.is_empty() || a.doctor_code.is_empty() {
            return Err(WardbellError::BadRequest(
                "appointmentId, userCode and doctorCode are required".into(),
            ));
        }

        let user = Target::User(a.user_code.clone());
        let doctor = Target::Doctor(a.doctor_code.clone());
        let (tag, targets) = match self.event {
            AppointmentEventKind::Created => (kind::APPOINTMENT_CREATED, vec![doctor, Target::Admins]),
            AppointmentEventKind::Cancelled => {
                (kind::APPOINTMENT_CANCELLED, vec![user, doctor, Target::Admins])
            }
            AppointmentEventKind::StatusChanged => {
                if a.status.as_deref().map_or(true, str::is_empty) {
                    return Err(WardbellError::BadRequest("status_changed requires status".into()));
                }
                (kind::APPOINTMENT_STATUS_CHANGED, vec![user])
            }
        };

        Ok((Envelope::from_content(tag, a)?, targets))
    }
}
