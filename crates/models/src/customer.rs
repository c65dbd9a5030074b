use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::serde_helpers::empty_string_as_none;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
}

/// `customers` row. Columns without business rules pass through in `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    #[serde(default)]
    pub auth_user_id: Option<Uuid>,
    #[serde(default)]
    pub customer_code: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub aadhaar_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub login_enabled: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Admin customer onboarding form. Older form field names are accepted as aliases.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Aadhaar number is required"))]
    pub aadhaar_number: String,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub dob: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub gender: Option<String>,
    #[serde(default, alias = "address", deserialize_with = "empty_string_as_none")]
    pub residential_address: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub landmark: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub area_branch: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub business_address: Option<String>,
    #[serde(default, alias = "father_spouse_name", deserialize_with = "empty_string_as_none")]
    pub father_or_spouse_name: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub nominee_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub nominee_relationship: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, max = 150, message = "Nominee age is out of range"))]
    pub nominee_age: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub nominee_phone: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub scheme_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub scheme_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub payment_mode: Option<String>,
    #[serde(default, alias = "scheme_amount")]
    #[validate(range(min = 0.0, message = "Installment amount cannot be negative"))]
    pub installment_amount: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub scheme_start_date: Option<NaiveDate>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub book_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub sales_officer_id: Option<Uuid>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub sales_officer_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: CustomerStatus,
}

/// Insert payload for `customers`.
#[derive(Debug, Clone, Serialize)]
pub struct NewCustomer {
    pub auth_user_id: Uuid,
    pub customer_code: String,
    pub full_name: String,
    pub phone: String,
    pub aadhaar_number: String,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub residential_address: Option<String>,
    pub landmark: Option<String>,
    pub area_branch: Option<String>,
    pub business_address: Option<String>,
    pub father_or_spouse_name: Option<String>,
    pub nominee_name: Option<String>,
    pub nominee_relationship: Option<String>,
    pub nominee_age: Option<i32>,
    pub nominee_phone: Option<String>,
    pub scheme_type: Option<String>,
    pub scheme_number: Option<String>,
    pub payment_mode: Option<String>,
    pub installment_amount: Option<f64>,
    pub scheme_start_date: Option<NaiveDate>,
    pub book_number: Option<String>,
    pub sales_officer_id: Option<Uuid>,
    pub sales_officer_name: Option<String>,
    pub notes: Option<String>,
    pub status: CustomerStatus,
    pub login_enabled: bool,
    pub is_active: bool,
}

impl NewCustomer {
    pub fn from_request(req: &CreateCustomerRequest, auth_user_id: Uuid, customer_code: String) -> Self {
        Self {
            auth_user_id,
            customer_code,
            full_name: req.full_name.trim().to_string(),
            phone: req.phone.trim().to_string(),
            aadhaar_number: req.aadhaar_number.trim().to_string(),
            dob: req.dob,
            gender: req.gender.clone(),
            residential_address: req.residential_address.clone(),
            landmark: req.landmark.clone(),
            area_branch: req.area_branch.clone(),
            business_address: req.business_address.clone(),
            father_or_spouse_name: req.father_or_spouse_name.clone(),
            nominee_name: req.nominee_name.clone(),
            nominee_relationship: req.nominee_relationship.clone(),
            nominee_age: req.nominee_age,
            nominee_phone: req.nominee_phone.clone(),
            scheme_type: req.scheme_type.clone(),
            scheme_number: req.scheme_number.clone(),
            payment_mode: req.payment_mode.clone(),
            installment_amount: req.installment_amount,
            scheme_start_date: req.scheme_start_date,
            book_number: req.book_number.clone(),
            sales_officer_id: req.sales_officer_id,
            sales_officer_name: req.sales_officer_name.clone(),
            notes: req.notes.clone(),
            status: req.status,
            login_enabled: true,
            is_active: req.status == CustomerStatus::Active,
        }
    }
}

/// Body of the access-activation endpoint; either phone key is accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerAccessRequest {
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub admin_id: Option<Uuid>,
}

impl CustomerAccessRequest {
    pub fn target_phone(&self) -> Option<&str> {
        [self.customer_phone.as_deref(), self.phone.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|p| !p.is_empty())
    }
}

/// Patch applied when login access is granted.
#[derive(Debug, Clone, Serialize)]
pub struct AccessActivation {
    pub login_enabled: bool,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl AccessActivation {
    pub fn at(now: DateTime<Utc>) -> Self { Self { login_enabled: true, is_active: true, updated_at: now } }
}

/// Upsert payload for `phone_whitelist`.
#[derive(Debug, Clone, Serialize)]
pub struct WhitelistEntry {
    pub phone: String,
    pub active: bool,
    pub added_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

/// Office quick-add, forwarded to the remote function as-is after the required fields are checked.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OfficeCustomerRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
