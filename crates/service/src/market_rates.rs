use backend::{Backend, Query, TableClient};
use chrono::Utc;
use models::market_rate::{MarketRate, NewMarketRate, PublishRateRequest};
use tracing::{info, instrument};
use validator::Validate;

use crate::errors::{ServiceError, ServiceResult};

#[derive(Clone)]
pub struct MarketRateService {
    rates: TableClient,
}

impl MarketRateService {
    pub fn new(backend: &Backend) -> Self { Self { rates: backend.table("market_rates") } }

    /// Rate history, newest first.
    pub async fn list(&self) -> ServiceResult<Vec<MarketRate>> {
        let query = Query::new().select("*").order_desc("date").order_desc("created_at");
        Ok(self.rates.select(&query).await?)
    }

    #[instrument(skip(self, req))]
    pub async fn publish(&self, req: PublishRateRequest) -> ServiceResult<MarketRate> {
        req.validate()?;
        let row = NewMarketRate::from_request(&req, Utc::now());
        let rate: MarketRate = self
            .rates
            .insert(&row)
            .await
            .map_err(ServiceError::upstream("Failed to publish market rate"))?;
        info!(rate_id = %rate.id, gold = rate.gold_rate_per_gram, silver = rate.silver_rate_per_gram, "market_rate_published");
        Ok(rate)
    }

    pub async fn latest(&self) -> ServiceResult<MarketRate> {
        let query = Query::new().select("*").order_desc("date").order_desc("created_at");
        self.rates
            .select_first(&query)
            .await?
            .ok_or_else(|| ServiceError::not_found("No market rate has been published yet"))
    }
}
