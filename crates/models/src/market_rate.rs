use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Metal a scheme accrues or a withdrawal pays out in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metal {
    #[default]
    Gold,
    Silver,
}

impl Metal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metal::Gold => "gold",
            Metal::Silver => "silver",
        }
    }
}

/// Dated per-gram price snapshot (`market_rates`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRate {
    pub id: Uuid,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub gold_rate_per_gram: f64,
    pub silver_rate_per_gram: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MarketRate {
    pub fn rate_for(&self, metal: Metal) -> f64 {
        match metal {
            Metal::Gold => self.gold_rate_per_gram,
            Metal::Silver => self.silver_rate_per_gram,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PublishRateRequest {
    #[validate(range(min = 0.01, message = "Gold rate must be positive"))]
    pub gold_rate_per_gram: f64,
    #[validate(range(min = 0.01, message = "Silver rate must be positive"))]
    pub silver_rate_per_gram: f64,
    #[serde(default, deserialize_with = "crate::serde_helpers::empty_string_as_none")]
    pub date: Option<NaiveDate>,
}

/// Insert payload for `market_rates`.
#[derive(Debug, Clone, Serialize)]
pub struct NewMarketRate {
    pub date: NaiveDate,
    pub gold_rate_per_gram: f64,
    pub silver_rate_per_gram: f64,
    pub updated_at: DateTime<Utc>,
}

impl NewMarketRate {
    pub fn from_request(req: &PublishRateRequest, now: DateTime<Utc>) -> Self {
        Self {
            date: req.date.unwrap_or_else(|| now.date_naive()),
            gold_rate_per_gram: req.gold_rate_per_gram,
            silver_rate_per_gram: req.silver_rate_per_gram,
            updated_at: now,
        }
    }
}
