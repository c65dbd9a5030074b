use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use models::customer::{CreateCustomerRequest, CustomerAccessRequest};
use models::market_rate::{MarketRate, PublishRateRequest};
use models::scheme::{CreateSchemeRequest, Scheme};
use models::staff::{AddFieldStaffRequest, CreateStaffRequest, StaffListing, StaffStatus};
use models::assignment::{SchedulePaymentRequest, UpdateAssignmentsRequest};
use models::stats::{AdminStats, DashboardSnapshot};
use serde::Deserialize;
use serde_json::{json, Value};
use service::sessions::Claims;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::extract::{ApiJson, OptionalApiJson};
use crate::state::AppState;

#[utoipa::path(
    post, path = "/api/admin/customers/create", tag = "admin",
    request_body = crate::openapi::CreateCustomerDoc,
    responses(
        (status = 200, description = "Customer created"),
        (status = 400, description = "Validation Error", body = crate::openapi::ErrorBody),
        (status = 409, description = "Phone or Aadhaar already registered", body = crate::openapi::ErrorBody),
        (status = 500, description = "Auth or database failure", body = crate::openapi::ErrorBody)
    )
)]
pub async fn create_customer(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateCustomerRequest>,
) -> Result<Json<Value>, ApiError> {
    let created = state.customers.create(input).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Customer created successfully",
        "customer": created.customer,
        "enrolled_scheme_id": created.enrolled_scheme_id,
    })))
}

#[utoipa::path(
    post, path = "/api/admin/customers/access", tag = "admin",
    request_body = crate::openapi::CustomerAccessDoc,
    responses(
        (status = 200, description = "Access activated"),
        (status = 400, description = "Phone missing", body = crate::openapi::ErrorBody),
        (status = 404, description = "No customer for this phone", body = crate::openapi::ErrorBody)
    )
)]
pub async fn activate_access(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(input): ApiJson<CustomerAccessRequest>,
) -> Result<Json<Value>, ApiError> {
    let granted = state.customers.activate_access(input, Some(claims.sub)).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Access activated successfully",
        "customer": granted.customer,
        "profile_id": granted.profile_id,
    })))
}

#[utoipa::path(get, path = "/api/admin/customers", tag = "admin", responses((status = 200, description = "Customer directory")))]
pub async fn list_customers(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.customers.list().await?))
}

#[utoipa::path(
    post, path = "/api/admin/staff/create", tag = "admin",
    request_body = crate::openapi::CreateStaffDoc,
    responses(
        (status = 200, description = "Staff created"),
        (status = 400, description = "Validation Error", body = crate::openapi::ErrorBody),
        (status = 409, description = "Username taken", body = crate::openapi::ErrorBody)
    )
)]
pub async fn create_staff(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateStaffRequest>,
) -> Result<Json<Value>, ApiError> {
    let staff = state.staff.create(input).await?;
    Ok(Json(json!({ "success": true, "message": "Staff created successfully", "staff": staff })))
}

#[utoipa::path(
    post, path = "/api/admin/staff/add", tag = "admin",
    request_body = crate::openapi::AddFieldStaffDoc,
    responses((status = 200, description = "Field staff created"), (status = 400, description = "Validation Error", body = crate::openapi::ErrorBody))
)]
pub async fn add_field_staff(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<AddFieldStaffRequest>,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.staff.add_field_staff(input).await?;
    Ok(Json(json!({ "success": true, "userId": user_id })))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct StaffListQuery {
    /// Case-insensitive match on name, username or staff code
    pub q: Option<String>,
}

#[utoipa::path(get, path = "/api/admin/staff/list", tag = "admin", params(StaffListQuery), responses((status = 200, description = "Staff directory")))]
pub async fn list_staff(
    State(state): State<AppState>,
    Query(q): Query<StaffListQuery>,
) -> Result<Json<Vec<StaffListing>>, ApiError> {
    Ok(Json(state.staff.list(q.q.as_deref()).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleStatusInput {
    #[serde(default, alias = "currentStatus")]
    pub current_status: Option<StaffStatus>,
}

#[utoipa::path(
    post, path = "/api/admin/staff/{id}/toggle-status", tag = "admin",
    params(("id" = Uuid, Path, description = "Staff id")),
    responses((status = 200, description = "Status toggled"))
)]
pub async fn toggle_staff_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    OptionalApiJson(input): OptionalApiJson<ToggleStatusInput>,
) -> Result<Json<Value>, ApiError> {
    let current = input.and_then(|i| i.current_status);
    Ok(Json(state.staff.toggle_status(id, current).await?))
}

#[utoipa::path(
    get, path = "/api/admin/staff/{id}", tag = "admin",
    params(("id" = Uuid, Path, description = "Staff id")),
    responses((status = 200, description = "Staff details"), (status = 404, description = "Not found", body = crate::openapi::ErrorBody))
)]
pub async fn staff_details(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.staff.details(id).await?))
}

#[utoipa::path(
    put, path = "/api/admin/staff/{id}/assignments", tag = "admin",
    params(("id" = Uuid, Path, description = "Staff id")),
    responses((status = 200, description = "Assignments replaced"))
)]
pub async fn update_staff_assignments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<UpdateAssignmentsRequest>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.staff.update_assignments(id, input).await?))
}

#[utoipa::path(
    post, path = "/api/admin/staff/{id}/payments", tag = "admin",
    params(("id" = Uuid, Path, description = "Staff id")),
    responses((status = 200, description = "Payment scheduled"), (status = 400, description = "Validation Error", body = crate::openapi::ErrorBody))
)]
pub async fn schedule_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<SchedulePaymentRequest>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.staff.schedule_payment(id, input).await?))
}

#[utoipa::path(get, path = "/api/admin/schemes", tag = "admin", responses((status = 200, description = "Schemes, newest first")))]
pub async fn list_schemes(State(state): State<AppState>) -> Result<Json<Vec<Scheme>>, ApiError> {
    Ok(Json(state.schemes.list().await?))
}

#[utoipa::path(
    post, path = "/api/admin/schemes", tag = "admin",
    request_body = crate::openapi::CreateSchemeDoc,
    responses((status = 200, description = "Scheme created"), (status = 400, description = "Validation Error", body = crate::openapi::ErrorBody))
)]
pub async fn create_scheme(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateSchemeRequest>,
) -> Result<Json<Value>, ApiError> {
    let scheme = state.schemes.create(input).await?;
    Ok(Json(json!({ "success": true, "scheme": scheme })))
}

#[utoipa::path(get, path = "/api/admin/market-rates", tag = "admin", responses((status = 200, description = "Rate history, newest first")))]
pub async fn list_market_rates(State(state): State<AppState>) -> Result<Json<Vec<MarketRate>>, ApiError> {
    Ok(Json(state.market_rates.list().await?))
}

#[utoipa::path(
    post, path = "/api/admin/market-rates", tag = "admin",
    request_body = crate::openapi::PublishRateDoc,
    responses((status = 200, description = "Rate published"), (status = 400, description = "Validation Error", body = crate::openapi::ErrorBody))
)]
pub async fn publish_market_rate(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<PublishRateRequest>,
) -> Result<Json<Value>, ApiError> {
    let rate = state.market_rates.publish(input).await?;
    Ok(Json(json!({ "success": true, "rate": rate })))
}

#[utoipa::path(get, path = "/api/admin/withdrawals", tag = "admin", responses((status = 200, description = "Withdrawals from the remote function")))]
pub async fn admin_list_withdrawals(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.withdrawals.admin_list().await?))
}

#[utoipa::path(post, path = "/api/admin/withdrawals", tag = "admin", responses((status = 200, description = "Forwarded to the remote function")))]
pub async fn admin_process_withdrawal(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.withdrawals.admin_process(payload).await?))
}

#[utoipa::path(get, path = "/api/admin/stats", tag = "admin", responses((status = 200, description = "Exact table counts")))]
pub async fn admin_stats(State(state): State<AppState>) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(state.stats.admin_stats().await?))
}

/// Served from the last background refresh; never waits on the backend.
#[utoipa::path(get, path = "/api/admin/dashboard", tag = "admin", responses((status = 200, description = "Cached dashboard snapshot")))]
pub async fn dashboard(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.dashboard.borrow().clone())
}
