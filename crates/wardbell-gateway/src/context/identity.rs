use std::collections::HashMap;

use async_trait::async_trait;

use wardbell_core::error::{Result, WardbellError};
use wardbell_core::protocol::Subject;

use crate::config::AuthSection;

/// Resolves a handshake token to the subject the socket will represent.
///
/// Token issuance and JWT validation live in the login service; the gateway
/// only needs the resulting role and code.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Subject>;
}

/// Fixed token table loaded from config.
#[derive(Debug, Default)]
pub struct StaticTokens {
    tokens: HashMap<String, Subject>,
}

impl StaticTokens {
    pub fn from_config(auth: &AuthSection) -> Result<Self> {
        let mut tokens = HashMap::with_capacity(auth.tokens.len());
        for t in &auth.tokens {
            tokens.insert(t.token.clone(), t.subject()?);
        }
        Ok(Self { tokens })
    }

    pub fn with_token(mut self, token: impl Into<String>, subject: Subject) -> Self {
        self.tokens.insert(token.into(), subject);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl Authenticator for StaticTokens {
    async fn authenticate(&self, token: &str) -> Result<Subject> {
        self.tokens.get(token).cloned().ok_or(WardbellError::AuthFailed)
    }
}
