use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::serde_helpers::empty_string_as_none;

pub const STAFF_EMAIL_DOMAIN: &str = "staff.local";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffStatus {
    #[default]
    Active,
    Inactive,
}

impl StaffStatus {
    pub fn toggled(self) -> StaffStatus {
        match self {
            StaffStatus::Active => StaffStatus::Inactive,
            StaffStatus::Inactive => StaffStatus::Active,
        }
    }
}

/// `staff` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    #[serde(default)]
    pub auth_user_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: StaffStatus,
    #[serde(default)]
    pub staff_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStaffRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub phone: Option<String>,
    #[serde(default = "default_staff_role")]
    pub role: String,
    #[serde(default)]
    pub status: StaffStatus,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub designation: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Salary cannot be negative"))]
    pub salary: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub joining_date: Option<NaiveDate>,
}

fn default_staff_role() -> String { "staff".to_string() }

impl CreateStaffRequest {
    pub fn normalized_username(&self) -> String { self.username.trim().to_lowercase() }

    /// Login handle for staff, who sign in by username rather than phone.
    pub fn synthetic_email(&self) -> String {
        format!("{}@{}", self.normalized_username(), STAFF_EMAIL_DOMAIN)
    }
}

/// Insert payload for `staff`.
#[derive(Debug, Clone, Serialize)]
pub struct NewStaff {
    pub auth_user_id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub status: StaffStatus,
    pub address: Option<String>,
    pub designation: Option<String>,
    pub salary: Option<f64>,
    pub joining_date: Option<NaiveDate>,
}

impl NewStaff {
    pub fn from_request(req: &CreateStaffRequest, auth_user_id: Uuid) -> Self {
        Self {
            auth_user_id,
            name: req.name.trim().to_string(),
            username: req.normalized_username(),
            email: req.synthetic_email(),
            phone: req.phone.clone(),
            role: req.role.clone(),
            status: req.status,
            address: req.address.clone(),
            designation: req.designation.clone(),
            salary: req.salary,
            joining_date: req.joining_date,
        }
    }
}

/// Field (collection) staff onboarding.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddFieldStaffRequest {
    #[serde(default)]
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[serde(default, alias = "fullName")]
    #[validate(length(min = 1, message = "Name is required"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[serde(default = "default_field_staff_type", alias = "staffType")]
    pub staff_type: String,
    #[serde(default, alias = "dailyTarget")]
    #[validate(range(min = 0.0, message = "Daily target cannot be negative"))]
    pub daily_target: Option<f64>,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

fn default_field_staff_type() -> String { "collection".to_string() }

/// Insert payload for `staff_metadata`.
#[derive(Debug, Clone, Serialize)]
pub struct NewStaffMetadata {
    pub user_id: Uuid,
    pub staff_type: String,
    pub daily_target: Option<f64>,
    pub is_active: bool,
}

/// Directory entry as returned by the remote `list-staff` function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffListing {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub staff_code: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl StaffListing {
    /// Case-insensitive substring match on name, username or staff code.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.name, &self.username, &self.staff_code]
            .into_iter()
            .flatten()
            .any(|v| v.to_lowercase().contains(&needle))
    }
}
