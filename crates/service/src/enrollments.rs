use backend::{Backend, TableClient};
use chrono::Utc;
use models::enrollment::{EnrollRequest, NewEnrollment};
use serde_json::Value;
use tracing::{info, instrument};
use validator::Validate;

use crate::errors::{ServiceError, ServiceResult};

#[derive(Clone)]
pub struct EnrollmentService {
    enrollments: TableClient,
}

impl EnrollmentService {
    pub fn new(backend: &Backend) -> Self { Self { enrollments: backend.table("user_schemes") } }

    /// Enroll a customer in a scheme; returns the stored `user_schemes` row.
    #[instrument(skip(self, req), fields(customer_id = %req.customer_id, scheme_id = %req.scheme_id))]
    pub async fn enroll(&self, req: EnrollRequest) -> ServiceResult<Value> {
        req.validate()?;
        let row = NewEnrollment::from_request(&req, Utc::now().date_naive());
        let saved = self
            .enrollments
            .insert(&row)
            .await
            .map_err(ServiceError::upstream("Failed to enroll customer"))?;
        info!("customer_enrolled");
        Ok(saved)
    }
}
