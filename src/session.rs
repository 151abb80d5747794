//! Explicit session context passed into every backend call.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorRole {
    Manager,
    Owner,
    Admin,
    #[serde(other)]
    Staff,
}

impl OperatorRole {
    /// Roles allowed to override protections on verified entries.
    pub fn is_privileged(self) -> bool {
        matches!(
            self,
            OperatorRole::Manager | OperatorRole::Owner | OperatorRole::Admin
        )
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manager" => OperatorRole::Manager,
            "owner" => OperatorRole::Owner,
            "admin" => OperatorRole::Admin,
            _ => OperatorRole::Staff,
        }
    }
}

impl fmt::Display for OperatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatorRole::Staff => "staff",
            OperatorRole::Manager => "manager",
            OperatorRole::Owner => "owner",
            OperatorRole::Admin => "admin",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: OperatorRole,
}

/// Signed-in operator plus the bearer token the backend issued.
#[derive(Clone)]
pub struct Session {
    token: Zeroizing<String>,
    pub operator: Operator,
}

impl Session {
    pub fn new(token: impl Into<String>, operator: Operator) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
            operator,
        }
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.token.as_str())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("operator", &self.operator)
            .finish()
    }
}
