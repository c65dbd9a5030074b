//! Office-side withdrawal handling.
//!
//! Transitions are checked on the fetched row, then written with a
//! `status=eq.<expected>` guard. A concurrent writer that got there first makes
//! the guarded update match nothing, which is reported as an invalid transition
//! from whatever state the row is in now.

use backend::{Backend, Query, TableClient};
use chrono::Utc;
use models::withdrawal::{RejectWithdrawalRequest, Withdrawal, WithdrawalStatus};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{ServiceError, ServiceResult};
use crate::market_rates::MarketRateService;

const LIST_COLUMNS: &str = "*,customers(full_name,phone),user_schemes(scheme_id,total_grams,schemes(name))";

#[derive(Clone)]
pub struct WithdrawalService {
    backend: Backend,
    withdrawals: TableClient,
    rates: MarketRateService,
}

impl WithdrawalService {
    pub fn new(backend: &Backend) -> Self {
        Self { withdrawals: backend.table("withdrawals"), rates: MarketRateService::new(backend), backend: backend.clone() }
    }

    /// Every withdrawal with its customer and scheme, newest first.
    pub async fn list(&self) -> ServiceResult<Vec<Withdrawal>> {
        let query = Query::new().select(LIST_COLUMNS).order_desc("created_at");
        Ok(self.withdrawals.select(&query).await?)
    }

    async fn fetch(&self, id: Uuid) -> ServiceResult<Withdrawal> {
        self.withdrawals
            .select_first(&Query::new().select("*").eq("id", id))
            .await?
            .ok_or_else(|| ServiceError::not_found("Withdrawal not found"))
    }

    async fn write_guarded<B: Serialize>(
        &self,
        id: Uuid,
        expected: WithdrawalStatus,
        next: WithdrawalStatus,
        patch: &B,
    ) -> ServiceResult<Withdrawal> {
        let filter = Query::new().eq("id", id).eq("status", expected);
        let rows: Vec<Withdrawal> = self.withdrawals.update(&filter, patch).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(row),
            None => {
                let current = self.fetch(id).await?;
                warn!(withdrawal_id = %id, expected = %expected, found = %current.status, "lost withdrawal transition race");
                Err(ServiceError::InvalidTransition { from: current.status, to: next })
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn approve(&self, id: Uuid, approver: Uuid) -> ServiceResult<Withdrawal> {
        let mut w = self.fetch(id).await?;
        let expected = w.status;
        let patch = w.approve(approver, Utc::now())?;
        let row = self.write_guarded(id, expected, WithdrawalStatus::Approved, &patch).await?;
        info!(withdrawal_id = %id, %approver, "withdrawal_approved");
        Ok(row)
    }

    /// Pays out at the latest published rate for the withdrawal's metal.
    #[instrument(skip(self))]
    pub async fn process(&self, id: Uuid) -> ServiceResult<Withdrawal> {
        let mut w = self.fetch(id).await?;
        if !w.status.can_transition_to(WithdrawalStatus::Processed) {
            return Err(ServiceError::InvalidTransition { from: w.status, to: WithdrawalStatus::Processed });
        }
        let rate = self.rates.latest().await?;
        let expected = w.status;
        let patch = w.process(rate.rate_for(w.metal), Utc::now())?;
        let row = self.write_guarded(id, expected, WithdrawalStatus::Processed, &patch).await?;
        info!(withdrawal_id = %id, final_amount = patch.final_amount, "withdrawal_processed");
        Ok(row)
    }

    #[instrument(skip(self, req))]
    pub async fn reject(&self, id: Uuid, req: RejectWithdrawalRequest) -> ServiceResult<Withdrawal> {
        let mut w = self.fetch(id).await?;
        let expected = w.status;
        let patch = w.reject(req.reason)?;
        let row = self.write_guarded(id, expected, WithdrawalStatus::Rejected, &patch).await?;
        info!(withdrawal_id = %id, "withdrawal_rejected");
        Ok(row)
    }

    /// Admin listing through the remote function.
    pub async fn admin_list(&self) -> ServiceResult<Value> {
        Ok(self.backend.functions().invoke("list-withdrawals", &json!({})).await?)
    }

    pub async fn admin_process(&self, payload: Value) -> ServiceResult<Value> {
        Ok(self.backend.functions().invoke("process-withdrawal", &payload).await?)
    }
}
