use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique login handle of an authentication identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum IdentityHandle {
    Phone(String),
    Email(String),
}

impl IdentityHandle {
    pub fn as_str(&self) -> &str {
        match self {
            IdentityHandle::Phone(v) | IdentityHandle::Email(v) => v,
        }
    }
}

/// Identity to create in the auth subsystem; always created pre-verified.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub handle: IdentityHandle,
    pub password: String,
    pub metadata: serde_json::Value,
}

/// Identity as returned by the auth subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}
