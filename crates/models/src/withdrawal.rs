//! Withdrawal lifecycle.
//!
//! `pending -> approved -> processed` or `pending -> rejected`. Both
//! `processed` and `rejected` are terminal and nothing moves backwards.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{FieldErrors, ModelError};
use crate::market_rate::Metal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Processed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Processed => "processed",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Processed | WithdrawalStatus::Rejected)
    }

    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        matches!(
            (self, next),
            (WithdrawalStatus::Pending, WithdrawalStatus::Approved)
                | (WithdrawalStatus::Pending, WithdrawalStatus::Rejected)
                | (WithdrawalStatus::Approved, WithdrawalStatus::Processed)
        )
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: Uuid,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub user_scheme_id: Option<Uuid>,
    #[serde(default)]
    pub metal: Metal,
    #[serde(default)]
    pub requested_grams: f64,
    pub status: WithdrawalStatus,
    #[serde(default)]
    pub approved_by: Option<Uuid>,
    #[serde(default)]
    pub approved_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub final_grams: Option<f64>,
    #[serde(default)]
    pub final_amount: Option<f64>,
    #[serde(default)]
    pub processed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Embedded `customers(full_name, phone)` when selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customers: Option<serde_json::Value>,
    /// Embedded `user_schemes(...)` when selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_schemes: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectWithdrawalRequest {
    #[serde(default, alias = "rejected_reason", deserialize_with = "crate::serde_helpers::empty_string_as_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalPatch {
    pub status: WithdrawalStatus,
    pub approved_by: Uuid,
    pub approved_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingPatch {
    pub status: WithdrawalStatus,
    pub final_grams: f64,
    pub final_amount: f64,
    pub processed_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectionPatch {
    pub status: WithdrawalStatus,
    pub rejected_reason: Option<String>,
}

impl Withdrawal {
    fn ensure_transition(&self, next: WithdrawalStatus) -> Result<(), ModelError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(ModelError::InvalidTransition { from: self.status, to: next })
        }
    }

    /// `pending -> approved`, stamping approver and time.
    pub fn approve(&mut self, approver: Uuid, at: DateTime<Utc>) -> Result<ApprovalPatch, ModelError> {
        self.ensure_transition(WithdrawalStatus::Approved)?;
        self.status = WithdrawalStatus::Approved;
        self.approved_by = Some(approver);
        self.approved_date = Some(at);
        Ok(ApprovalPatch { status: self.status, approved_by: approver, approved_date: at })
    }

    /// `approved -> processed`; payout is requested grams times the per-gram rate.
    pub fn process(&mut self, rate_per_gram: f64, at: DateTime<Utc>) -> Result<ProcessingPatch, ModelError> {
        self.ensure_transition(WithdrawalStatus::Processed)?;
        let mut errs = FieldErrors::new();
        if !(self.requested_grams > 0.0) {
            errs.add("requested_grams", "Requested weight must be positive");
        }
        if !(rate_per_gram > 0.0) {
            errs.add("rate_per_gram", "Market rate must be positive");
        }
        errs.into_result()?;

        let amount = self.requested_grams * rate_per_gram;
        self.status = WithdrawalStatus::Processed;
        self.final_grams = Some(self.requested_grams);
        self.final_amount = Some(amount);
        self.processed_date = Some(at);
        Ok(ProcessingPatch {
            status: self.status,
            final_grams: self.requested_grams,
            final_amount: amount,
            processed_date: at,
        })
    }

    /// `pending -> rejected`.
    pub fn reject(&mut self, reason: Option<String>) -> Result<RejectionPatch, ModelError> {
        self.ensure_transition(WithdrawalStatus::Rejected)?;
        self.status = WithdrawalStatus::Rejected;
        self.rejected_reason = reason.clone();
        Ok(RejectionPatch { status: self.status, rejected_reason: reason })
    }
}
