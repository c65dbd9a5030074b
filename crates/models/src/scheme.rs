use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::market_rate::Metal;
use crate::serde_helpers::empty_string_as_none;

/// `schemes` row. The stored `emi_amount` column is exposed as `installment_amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scheme {
    pub id: Uuid,
    pub name: String,
    #[serde(rename(serialize = "installment_amount"), alias = "installment_amount", default)]
    pub emi_amount: Option<f64>,
    #[serde(default)]
    pub duration_months: Option<i32>,
    #[serde(default)]
    pub min_amount: Option<f64>,
    #[serde(default)]
    pub max_amount: Option<f64>,
    #[serde(default)]
    pub target_grams: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub metal_type: Metal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSchemeRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Scheme name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(range(exclusive_min = 0.0, message = "Installment amount must be positive"))]
    pub installment_amount: f64,
    #[serde(default)]
    #[validate(range(min = 1, message = "Duration must be at least one month"))]
    pub duration_months: i32,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Target grams cannot be negative"))]
    pub target_grams: Option<f64>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub asset_type: Metal,
}

fn default_active() -> bool { true }

/// Insert payload for `schemes`; fixed installment schemes use one amount for emi, min and max.
#[derive(Debug, Clone, Serialize)]
pub struct NewScheme {
    pub name: String,
    pub emi_amount: f64,
    pub min_amount: f64,
    pub max_amount: f64,
    pub duration_months: i32,
    pub description: Option<String>,
    pub target_grams: Option<f64>,
    pub is_active: bool,
    pub metal_type: Metal,
}

impl From<&CreateSchemeRequest> for NewScheme {
    fn from(req: &CreateSchemeRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            emi_amount: req.installment_amount,
            min_amount: req.installment_amount,
            max_amount: req.installment_amount,
            duration_months: req.duration_months,
            description: req.description.clone(),
            target_grams: req.target_grams,
            is_active: req.active,
            metal_type: req.asset_type,
        }
    }
}
