use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use wardbell_core::error::WardbellError;
use wardbell_core::protocol::{Role, Subject};

use crate::app_state::AppState;
use crate::error::HttpError;

/// Caller of a dispatch entry point, resolved from `Authorization: Bearer`.
///
/// Only admin subjects (back-office users and internal services holding an
/// admin token) may push notifications.
#[derive(Debug, Clone)]
pub struct DispatchCaller(pub Subject);

#[async_trait]
impl FromRequestParts<AppState> for DispatchCaller {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(WardbellError::AuthFailed)?;

        let subject = state.authenticator().authenticate(token).await?;
        if subject.role() != Role::Admin {
            tracing::debug!(%subject, "dispatch call refused");
            return Err(WardbellError::Forbidden(format!("{} may not dispatch", subject.role())).into());
        }
        Ok(Self(subject))
    }
}
