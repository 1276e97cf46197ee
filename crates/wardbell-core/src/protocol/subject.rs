//! Subject model: the business entity a live connection represents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WardbellError};

/// Subject key shared by every admin connection.
pub const ADMIN_KEY: &str = "admin";

/// Connection role. Fixed for the lifetime of a connection.
///
/// Wire tags follow the web client: patients are `"user"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(rename = "user", alias = "patient")]
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "user",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = WardbellError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" | "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(WardbellError::BadRequest(format!("unknown role: {other}"))),
        }
    }
}

/// Role plus business key (user code, doctor code, or the constant admin key).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subject {
    role: Role,
    key: String,
}

impl Subject {
    /// Build a subject from a role and an optional code.
    ///
    /// Patients and doctors require a non-empty code. Admins ignore it.
    pub fn new(role: Role, code: Option<&str>) -> Result<Self> {
        match role {
            Role::Admin => Ok(Self::admin()),
            Role::Patient | Role::Doctor => {
                let code = code.map(str::trim).unwrap_or_default();
                if code.is_empty() {
                    return Err(WardbellError::BadRequest(format!(
                        "{role} subject requires a code"
                    )));
                }
                Ok(Self {
                    role,
                    key: code.to_string(),
                })
            }
        }
    }

    pub fn patient(code: impl Into<String>) -> Self {
        Self {
            role: Role::Patient,
            key: code.into(),
        }
    }

    pub fn doctor(code: impl Into<String>) -> Self {
        Self {
            role: Role::Doctor,
            key: code.into(),
        }
    }

    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            key: ADMIN_KEY.to_string(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role, self.key)
    }
}
