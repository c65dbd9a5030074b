use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role tag stored on `profiles.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[serde(alias = "staff")]
    OfficeStaff,
    CollectionStaff,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::OfficeStaff => "office_staff",
            Role::CollectionStaff => "collection_staff",
            Role::Customer => "customer",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            // older profiles carry the generic `staff` tag
            "office_staff" | "staff" => Some(Role::OfficeStaff),
            "collection_staff" => Some(Role::CollectionStaff),
            "customer" => Some(Role::Customer),
            _ => None,
        }
    }

    /// Map a free-form staff role onto a profile role; generic or unknown tags become `office_staff`.
    pub fn for_staff(tag: &str) -> Role {
        match Role::parse(tag) {
            Some(Role::Admin) => Role::Admin,
            Some(Role::CollectionStaff) => Role::CollectionStaff,
            _ => Role::OfficeStaff,
        }
    }

    /// Field staff types (`collection`, `collection_staff`, ...) collect payments; anything else is office work.
    pub fn for_field_staff(staff_type: &str) -> Role {
        if staff_type.trim().to_ascii_lowercase().starts_with("collection") {
            Role::CollectionStaff
        } else {
            Role::for_staff(staff_type)
        }
    }

    /// Roles allowed into the office portal.
    pub fn is_office(&self) -> bool {
        matches!(self, Role::Admin | Role::OfficeStaff | Role::CollectionStaff)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Profile {
    pub fn role(&self) -> Option<Role> { self.role.as_deref().and_then(Role::parse) }
}

/// Insert payload for `profiles`; `id` equals the auth identity id.
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub role: Role,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub phone: Option<String>,
    pub login_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
