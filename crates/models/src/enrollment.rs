use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::serde_helpers::empty_string_as_none;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFrequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "amount_bounds_ordered", skip_on_field_errors = false))]
pub struct EnrollRequest {
    pub customer_id: Uuid,
    pub scheme_id: Uuid,
    #[serde(default)]
    pub payment_frequency: PaymentFrequency,
    #[validate(range(min = 0.0, message = "Minimum amount cannot be negative"))]
    pub min_amount: f64,
    #[validate(range(min = 0.0, message = "Maximum amount cannot be negative"))]
    pub max_amount: f64,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub start_date: Option<NaiveDate>,
}

fn amount_bounds_ordered(req: &EnrollRequest) -> Result<(), ValidationError> {
    if req.min_amount > req.max_amount {
        let mut err = ValidationError::new("amount_bounds");
        err.message = Some("Minimum amount cannot exceed maximum amount".into());
        return Err(err);
    }
    Ok(())
}

/// Insert payload for `user_schemes`.
#[derive(Debug, Clone, Serialize)]
pub struct NewEnrollment {
    pub customer_id: Uuid,
    pub scheme_id: Uuid,
    pub status: &'static str,
    pub payment_frequency: PaymentFrequency,
    pub min_amount: f64,
    pub max_amount: f64,
    pub start_date: NaiveDate,
    pub total_grams: f64,
    pub total_paid: f64,
}

impl NewEnrollment {
    pub fn from_request(req: &EnrollRequest, today: NaiveDate) -> Self {
        Self {
            customer_id: req.customer_id,
            scheme_id: req.scheme_id,
            status: "active",
            payment_frequency: req.payment_frequency,
            min_amount: req.min_amount,
            max_amount: req.max_amount,
            start_date: req.start_date.unwrap_or(today),
            total_grams: 0.0,
            total_paid: 0.0,
        }
    }

    /// Enrollment created alongside a new customer at the scheme's fixed amount.
    pub fn auto(customer_id: Uuid, scheme_id: Uuid, amount: f64, today: NaiveDate) -> Self {
        Self {
            customer_id,
            scheme_id,
            status: "active",
            payment_frequency: PaymentFrequency::Monthly,
            min_amount: amount,
            max_amount: amount,
            start_date: today,
            total_grams: 0.0,
            total_paid: 0.0,
        }
    }
}
