use backend::{Backend, Query, TableClient};
use models::scheme::{CreateSchemeRequest, NewScheme, Scheme};
use tracing::{info, instrument};
use validator::Validate;

use crate::errors::{ServiceError, ServiceResult};

#[derive(Clone)]
pub struct SchemeService {
    schemes: TableClient,
}

impl SchemeService {
    pub fn new(backend: &Backend) -> Self { Self { schemes: backend.table("schemes") } }

    pub async fn list(&self) -> ServiceResult<Vec<Scheme>> {
        let query = Query::new().select("*").order_desc("created_at");
        Ok(self.schemes.select(&query).await?)
    }

    #[instrument(skip(self, req), fields(name = %req.name))]
    pub async fn create(&self, req: CreateSchemeRequest) -> ServiceResult<Scheme> {
        req.validate()?;
        let scheme: Scheme = self
            .schemes
            .insert(&NewScheme::from(&req))
            .await
            .map_err(ServiceError::upstream("Failed to create scheme"))?;
        info!(scheme_id = %scheme.id, metal = scheme.metal_type.as_str(), "scheme_created");
        Ok(scheme)
    }
}
