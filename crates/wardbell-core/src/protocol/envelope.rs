//! Notification envelope (JSON text frame).

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WardbellError};

/// Type tags understood by the web client.
pub mod kind {
    pub const APPOINTMENT_CREATED: &str = "appointmentCreated";
    pub const APPOINTMENT_CANCELLED: &str = "appointmentCancelled";
    pub const APPOINTMENT_STATUS_CHANGED: &str = "appointmentStatusChanged";
    pub const NOTIFICATION: &str = "notification";
}

/// `{ "type": ..., "content": ... }`. `content` is opaque to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Caller-defined tag (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, content: Value) -> Self {
        Self {
            kind: kind.into(),
            content,
        }
    }

    /// Build an envelope from any serializable content.
    pub fn from_content<T: Serialize>(kind: impl Into<String>, content: &T) -> Result<Self> {
        let content = serde_json::to_value(content)
            .map_err(|e| WardbellError::BadRequest(format!("content encode failed: {e}")))?;
        Ok(Self::new(kind, content))
    }

    /// Serialize once; the returned bytes are cloned cheaply per recipient.
    pub fn encode(&self) -> Result<Bytes> {
        if self.kind.is_empty() {
            return Err(WardbellError::BadRequest("envelope type must not be empty".into()));
        }
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| WardbellError::Internal(format!("envelope encode failed: {e}")))
    }
}
