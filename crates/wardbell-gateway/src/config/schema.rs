use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use wardbell_core::error::{Result, WardbellError};
use wardbell_core::protocol::{Role, Subject};

use crate::realtime::ConnectionSettings;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub connection: ConnectionSection,

    #[serde(default)]
    pub auth: AuthSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(WardbellError::UnsupportedVersion);
        }

        self.connection.validate()?;
        self.auth.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".into()
}

/// Keepalive timing and queue limits applied to every connection.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    /// Peer-idle tolerance; pings go out at 9/10 of this.
    #[serde(default = "default_pong_wait_ms")]
    pub pong_wait_ms: u64,

    #[serde(default = "default_write_wait_ms")]
    pub write_wait_ms: u64,

    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            pong_wait_ms: default_pong_wait_ms(),
            write_wait_ms: default_write_wait_ms(),
            max_message_bytes: default_max_message_bytes(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl ConnectionSection {
    pub fn validate(&self) -> Result<()> {
        if !(10_000..=600_000).contains(&self.pong_wait_ms) {
            return Err(WardbellError::BadRequest(
                "connection.pong_wait_ms must be between 10000 and 600000".into(),
            ));
        }
        if !(1_000..=60_000).contains(&self.write_wait_ms) {
            return Err(WardbellError::BadRequest(
                "connection.write_wait_ms must be between 1000 and 60000".into(),
            ));
        }
        if self.write_wait_ms >= self.pong_wait_ms {
            return Err(WardbellError::BadRequest(
                "connection.write_wait_ms must be less than pong_wait_ms".into(),
            ));
        }
        if !(64..=65_536).contains(&self.max_message_bytes) {
            return Err(WardbellError::BadRequest(
                "connection.max_message_bytes must be between 64 and 65536".into(),
            ));
        }
        if !(1..=65_536).contains(&self.outbound_queue) {
            return Err(WardbellError::BadRequest(
                "connection.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }

    pub fn settings(&self) -> ConnectionSettings {
        ConnectionSettings::from_pong_wait(
            Duration::from_millis(self.pong_wait_ms),
            Duration::from_millis(self.write_wait_ms),
            self.max_message_bytes,
            self.outbound_queue,
        )
    }
}

fn default_pong_wait_ms() -> u64 {
    60_000
}
fn default_write_wait_ms() -> u64 {
    10_000
}
fn default_max_message_bytes() -> usize {
    512
}
fn default_outbound_queue() -> usize {
    256
}

/// Static token table. Tokens are issued by the login service; this table
/// only maps them to subjects for the socket handshake.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenEntry {
    pub token: String,
    pub role: Role,
    #[serde(default)]
    pub code: Option<String>,
}

impl TokenEntry {
    pub fn subject(&self) -> Result<Subject> {
        Subject::new(self.role, self.code.as_deref())
    }
}

impl AuthSection {
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for t in &self.tokens {
            if t.token.is_empty() {
                return Err(WardbellError::BadRequest("auth.tokens[].token must not be empty".into()));
            }
            if !seen.insert(t.token.as_str()) {
                return Err(WardbellError::BadRequest(format!(
                    "auth.tokens contains duplicate token for {}",
                    t.role
                )));
            }
            t.subject()?;
        }
        Ok(())
    }
}
