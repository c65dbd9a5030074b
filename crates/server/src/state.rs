use std::sync::Arc;

use backend::Backend;
use models::stats::DashboardSnapshot;
use service::assignments::AssignmentService;
use service::customers::CustomerService;
use service::enrollments::EnrollmentService;
use service::market_rates::MarketRateService;
use service::provisioning::BackendIdentityStore;
use service::schemes::SchemeService;
use service::sessions::{SessionIssuer, SessionSettings};
use service::staff::StaffService;
use service::stats::StatsService;
use service::withdrawals::WithdrawalService;
use tokio::sync::watch;

/// Shared handler state; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub customers: Arc<CustomerService<BackendIdentityStore>>,
    pub staff: Arc<StaffService<BackendIdentityStore>>,
    pub schemes: SchemeService,
    pub market_rates: MarketRateService,
    pub withdrawals: WithdrawalService,
    pub stats: StatsService,
    pub assignments: AssignmentService,
    pub enrollments: EnrollmentService,
    pub sessions: SessionIssuer,
    pub dashboard: watch::Receiver<DashboardSnapshot>,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(backend: Backend, sessions: SessionSettings, dashboard: watch::Receiver<DashboardSnapshot>) -> Self {
        let identities = Arc::new(BackendIdentityStore::new(backend.auth_admin()));
        Self {
            customers: Arc::new(CustomerService::new(backend.clone(), identities.clone())),
            staff: Arc::new(StaffService::new(backend.clone(), identities)),
            schemes: SchemeService::new(&backend),
            market_rates: MarketRateService::new(&backend),
            withdrawals: WithdrawalService::new(&backend),
            stats: StatsService::new(&backend),
            assignments: AssignmentService::new(&backend),
            enrollments: EnrollmentService::new(&backend),
            sessions: SessionIssuer::new(backend, sessions),
            dashboard,
            cookie_secure: false,
        }
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }
}
