//! Lightweight admin HTTP server
//!
//! Exposes `/healthz` and `/metrics` endpoints, with metrics provided by caller.

use std::future::Future;

use axum::http::StatusCode;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tracing::{error, info};

async fn healthz() -> &'static str { "OK" }

pub fn admin_router(metrics_fn: fn() -> (StatusCode, String)) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(move || async move { metrics_fn() }))
}

/// Serve the admin endpoints until `shutdown` resolves.
pub async fn serve_admin<S>(addr: &str, metrics_fn: fn() -> (StatusCode, String), shutdown: S) -> anyhow::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "admin server listening");
    axum::serve(listener, admin_router(metrics_fn)).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

/// Spawn the admin server on the current runtime; failures are logged, not fatal.
pub fn spawn_admin_server<S>(addr: &str, metrics_fn: fn() -> (StatusCode, String), shutdown: S) -> tokio::task::JoinHandle<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr = addr.to_string();
    tokio::spawn(async move {
        if let Err(e) = serve_admin(&addr, metrics_fn, shutdown).await {
            error!(%addr, error = %e, "admin server stopped with error");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn healthz_and_metrics_respond() {
        let app = admin_router(crate::metrics::encode_metrics);
        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app.oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
