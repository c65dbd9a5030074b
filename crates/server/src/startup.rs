use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use backend::{Backend, BackendSettings};
use chrono::Duration as ChronoDuration;
use common::admin_http::spawn_admin_server;
use common::metrics::encode_metrics;
use configs::AppConfig;
use models::stats::DashboardSnapshot;
use service::refresh::{BackendSnapshotSource, PeriodicRefresh};
use service::sessions::SessionSettings;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

pub fn backend_from_config(cfg: &AppConfig) -> Result<Backend, StartupError> {
    let b = &cfg.backend;
    let mut settings = BackendSettings::new(&b.url, &b.anon_key, &b.service_role_key);
    settings.function_name = b.function_name.clone();
    settings.timeout = b.timeout();
    Ok(Backend::new(settings)?)
}

pub fn session_settings(cfg: &AppConfig) -> SessionSettings {
    let mut settings = SessionSettings::new(&cfg.auth.jwt_secret, &cfg.auth.admin_alias_email)
        .with_office_alias(&cfg.auth.office_alias_email);
    settings.ttl = ChronoDuration::hours(cfg.auth.token_ttl_hours);
    settings
}

/// Router plus the refresh handle feeding its dashboard, if enabled.
pub fn build_app(cfg: &AppConfig, shutdown: &CancellationToken) -> Result<(Router, Option<PeriodicRefresh>), StartupError> {
    let backend = backend_from_config(cfg)?;

    let (refresh, dashboard) = if cfg.refresh.enabled {
        let source = Arc::new(BackendSnapshotSource::new(&backend));
        let refresh = PeriodicRefresh::spawn(source, cfg.refresh.interval(), shutdown.child_token());
        let rx = refresh.subscribe();
        (Some(refresh), rx)
    } else {
        let (_tx, rx) = watch::channel(DashboardSnapshot::default());
        (None, rx)
    };

    let state = AppState::new(backend, session_settings(cfg), dashboard).with_secure_cookies(cfg.auth.cookie_secure);
    Ok((routes::build_router(state, build_cors()), refresh))
}

/// Serve until `shutdown` is cancelled; in-flight requests are allowed to finish.
pub async fn run(cfg: AppConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    cfg.validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;

    let (app, refresh) = build_app(&cfg, &shutdown)?;

    // 可选：独立端口暴露 /healthz 与 /metrics
    let admin_task = cfg.server.admin_addr.as_deref().map(|addr| {
        let token = shutdown.clone();
        spawn_admin_server(addr, encode_metrics, async move { token.cancelled().await })
    });

    let addr: SocketAddr = cfg.bind_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, backend = %cfg.backend.url, refresh = cfg.refresh.enabled, "server listening");

    let token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    if let Some(refresh) = refresh {
        refresh.shutdown().await;
    }
    if let Some(task) = admin_task {
        let _ = task.await;
    }
    info!("server stopped");
    Ok(())
}
