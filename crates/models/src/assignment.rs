use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize)]
pub struct AssignStaffRequest {
    pub customer_id: Uuid,
    pub staff_id: Uuid,
}

/// Upsert payload for `staff_assignments` (one active assignment per customer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffAssignment {
    pub customer_id: Uuid,
    pub staff_id: Uuid,
    pub assigned_date: NaiveDate,
    pub is_active: bool,
}

impl StaffAssignment {
    pub fn new(req: &AssignStaffRequest, today: NaiveDate) -> Self {
        Self { customer_id: req.customer_id, staff_id: req.staff_id, assigned_date: today, is_active: true }
    }
}

/// Replaces the full set of customers a staff member collects from.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAssignmentsRequest {
    #[serde(default, alias = "customerIds")]
    pub customer_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SchedulePaymentRequest {
    #[serde(alias = "customerId")]
    pub customer_id: Uuid,
    #[validate(range(exclusive_min = 0.0, message = "Amount must be positive"))]
    pub amount: f64,
    #[serde(default, alias = "dueDate", deserialize_with = "crate::serde_helpers::empty_string_as_none")]
    pub due_date: Option<NaiveDate>,
}

impl SchedulePaymentRequest {
    /// Payload in the remote function's field naming.
    pub fn payload(&self, staff_id: Uuid) -> Value {
        serde_json::json!({
            "staffId": staff_id,
            "customerId": self.customer_id,
            "amount": self.amount,
            "dueDate": self.due_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_is_active_and_dated() {
        let req = AssignStaffRequest { customer_id: Uuid::new_v4(), staff_id: Uuid::new_v4() };
        let day = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let row = StaffAssignment::new(&req, day);
        assert!(row.is_active);
        assert_eq!(serde_json::to_value(&row).unwrap()["assigned_date"], "2024-05-02");
    }

    #[test]
    fn payment_amount_must_be_positive() {
        let req: SchedulePaymentRequest =
            serde_json::from_value(serde_json::json!({ "customerId": Uuid::nil(), "amount": 0 })).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn payment_payload_uses_function_field_names() {
        let req: SchedulePaymentRequest = serde_json::from_value(serde_json::json!({
            "customer_id": Uuid::nil(), "amount": 250.0, "due_date": "2024-06-01"
        }))
        .unwrap();
        let staff = Uuid::new_v4();
        let payload = req.payload(staff);
        assert_eq!(payload["staffId"], serde_json::json!(staff));
        assert_eq!(payload["dueDate"], "2024-06-01");
    }
}
