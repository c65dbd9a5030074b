//! Background refresh of read-only dashboard data.
//!
//! One task re-loads the snapshot on a fixed interval and publishes it on a
//! watch channel. Readers never wait on the backend. The task stops when the
//! token is cancelled, which also happens when the handle is dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backend::Backend;
use chrono::Utc;
use common::metrics::REFRESH_RUNS_TOTAL;
use models::stats::DashboardSnapshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{ServiceError, ServiceResult};
use crate::market_rates::MarketRateService;
use crate::stats::StatsService;

#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    async fn load(&self) -> ServiceResult<DashboardSnapshot>;
}

/// Admin counts plus the latest market rate.
#[derive(Clone)]
pub struct BackendSnapshotSource {
    stats: StatsService,
    rates: MarketRateService,
}

impl BackendSnapshotSource {
    pub fn new(backend: &Backend) -> Self {
        Self { stats: StatsService::new(backend), rates: MarketRateService::new(backend) }
    }
}

#[async_trait]
impl SnapshotSource for BackendSnapshotSource {
    async fn load(&self) -> ServiceResult<DashboardSnapshot> {
        let (stats, rate) = tokio::join!(self.stats.admin_stats(), self.rates.latest());
        let latest_rate = match rate {
            Ok(rate) => Some(rate),
            Err(ServiceError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        Ok(DashboardSnapshot { stats: stats?, latest_rate, refreshed_at: Some(Utc::now()) })
    }
}

pub struct PeriodicRefresh {
    rx: watch::Receiver<DashboardSnapshot>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicRefresh {
    /// Start refreshing now and then every `interval`. A failed run keeps the previous snapshot.
    pub fn spawn<S: SnapshotSource>(source: Arc<S>, interval: Duration, cancel: CancellationToken) -> Self {
        let (tx, rx) = watch::channel(DashboardSnapshot::default());
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval = ?interval, "dashboard refresh started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("dashboard refresh stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        match source.load().await {
                            Ok(snapshot) => {
                                REFRESH_RUNS_TOTAL.with_label_values(&["ok"]).inc();
                                debug!(customers = snapshot.stats.total_customers, "dashboard snapshot refreshed");
                                if tx.send(snapshot).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                REFRESH_RUNS_TOTAL.with_label_values(&["error"]).inc();
                                warn!(error = %e, "dashboard refresh failed; keeping previous snapshot");
                            }
                        }
                    }
                }
            }
        });
        Self { rx, cancel, handle: Some(handle) }
    }

    pub fn snapshot(&self) -> DashboardSnapshot { self.rx.borrow().clone() }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> { self.rx.clone() }

    /// Cancel and wait for the task to finish its current run.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PeriodicRefresh {
    fn drop(&mut self) { self.cancel.cancel(); }
}
