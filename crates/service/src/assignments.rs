use backend::{Backend, TableClient};
use chrono::Utc;
use models::assignment::{AssignStaffRequest, StaffAssignment};
use tracing::{info, instrument};

use crate::errors::{ServiceError, ServiceResult};

/// One active collector per customer; re-assigning replaces the previous row.
#[derive(Clone)]
pub struct AssignmentService {
    assignments: TableClient,
}

impl AssignmentService {
    pub fn new(backend: &Backend) -> Self { Self { assignments: backend.table("staff_assignments") } }

    #[instrument(skip(self, req), fields(customer_id = %req.customer_id, staff_id = %req.staff_id))]
    pub async fn assign(&self, req: AssignStaffRequest) -> ServiceResult<StaffAssignment> {
        let row = StaffAssignment::new(&req, Utc::now().date_naive());
        let saved = self
            .assignments
            .upsert("customer_id", &row)
            .await
            .map_err(ServiceError::upstream("Failed to assign staff"))?;
        info!("staff_assigned");
        Ok(saved)
    }
}
