use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::market_rate::MarketRate;

/// Exact row counts shown on the admin overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_customers: u64,
    pub total_schemes: u64,
    pub total_withdrawals: u64,
    pub total_payments: u64,
}

/// Read-only dashboard data kept warm by the background refresh task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub stats: AdminStats,
    pub latest_rate: Option<MarketRate>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl DashboardSnapshot {
    pub fn is_fresh(&self) -> bool { self.refreshed_at.is_some() }
}
