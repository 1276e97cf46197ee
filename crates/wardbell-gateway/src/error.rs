//! HTTP mapping for the shared error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use wardbell_core::error::{ClientCode, WardbellError};

/// `WardbellError` rendered as `{ "code", "msg" }` with a matching status.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct HttpError(#[from] pub WardbellError);

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self.0.client_code() {
            ClientCode::BadRequest | ClientCode::UnsupportedVersion => StatusCode::BAD_REQUEST,
            ClientCode::AuthFailed => StatusCode::UNAUTHORIZED,
            ClientCode::Forbidden => StatusCode::FORBIDDEN,
            ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "code": self.0.client_code().as_str(),
            "msg": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
