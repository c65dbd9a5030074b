pub mod admin;
pub mod auth;
pub mod office;

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{middleware, Json, Router};
use common::types::Health;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health::ok("server"))
}

#[utoipa::path(get, path = "/api/stats", tag = "public", responses((status = 200, description = "Public business figures")))]
pub async fn public_stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.stats.public_stats().await?))
}

/// Build the full application router: public, auth, admin and office routes plus API docs
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    // Public routes
    let public = Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(public_stats))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout));

    // Admin routes (role = admin)
    let admin_routes = Router::new()
        .route("/api/admin/check-auth", get(auth::check_auth))
        .route("/api/admin/customers", get(admin::list_customers))
        .route("/api/admin/customers/create", post(admin::create_customer))
        // 旧版前端使用的路径，请求体同上
        .route("/api/admin/customers/create-full", post(admin::create_customer))
        .route("/api/admin/customers/access", post(admin::activate_access))
        .route("/api/admin/staff/create", post(admin::create_staff))
        .route("/api/admin/staff/add", post(admin::add_field_staff))
        .route("/api/admin/staff/list", get(admin::list_staff))
        .route("/api/admin/staff/:id", get(admin::staff_details))
        .route("/api/admin/staff/:id/toggle-status", post(admin::toggle_staff_status))
        .route("/api/admin/staff/:id/assignments", put(admin::update_staff_assignments))
        .route("/api/admin/staff/:id/payments", post(admin::schedule_payment))
        .route("/api/admin/schemes", get(admin::list_schemes).post(admin::create_scheme))
        .route("/api/admin/market-rates", get(admin::list_market_rates).post(admin::publish_market_rate))
        .route("/api/admin/withdrawals", get(admin::admin_list_withdrawals).post(admin::admin_process_withdrawal))
        .route("/api/admin/stats", get(admin::admin_stats))
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin));

    // Office routes (admin or any staff role)
    let office_routes = Router::new()
        .route("/api/office/withdrawals", get(office::list_withdrawals))
        .route("/api/office/withdrawals/:id/approve", post(office::approve_withdrawal))
        .route("/api/office/withdrawals/:id/process", post(office::process_withdrawal))
        .route("/api/office/withdrawals/:id/reject", post(office::reject_withdrawal))
        .route("/api/office/assignments", post(office::assign_staff))
        .route("/api/office/enrollments", post(office::enroll))
        .route("/api/office/customers/add", post(office::add_customer))
        .route("/api/office/stats", get(office::office_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_office));

    public
        .merge(admin_routes)
        .merge(office_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径等，日志级别为 INFO
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // 响应返回时打点，包含状态码与耗时
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 失败（5xx 等）时以 ERROR 记录
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
