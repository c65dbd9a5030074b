use axum::extract::{Path, State};
use axum::{Extension, Json};
use models::assignment::AssignStaffRequest;
use models::customer::OfficeCustomerRequest;
use models::enrollment::EnrollRequest;
use models::withdrawal::{RejectWithdrawalRequest, Withdrawal};
use serde_json::{json, Value};
use service::sessions::Claims;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::extract::{ApiJson, OptionalApiJson};
use crate::state::AppState;

#[utoipa::path(get, path = "/api/office/withdrawals", tag = "office", responses((status = 200, description = "Withdrawals with customer and scheme")))]
pub async fn list_withdrawals(State(state): State<AppState>) -> Result<Json<Vec<Withdrawal>>, ApiError> {
    Ok(Json(state.withdrawals.list().await?))
}

#[utoipa::path(
    post, path = "/api/office/withdrawals/{id}/approve", tag = "office",
    params(("id" = Uuid, Path, description = "Withdrawal id")),
    responses(
        (status = 200, description = "Approved"),
        (status = 404, description = "Not found", body = crate::openapi::ErrorBody),
        (status = 409, description = "Not pending", body = crate::openapi::ErrorBody)
    )
)]
pub async fn approve_withdrawal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let row = state.withdrawals.approve(id, claims.sub).await?;
    Ok(Json(json!({ "success": true, "withdrawal": row })))
}

#[utoipa::path(
    post, path = "/api/office/withdrawals/{id}/process", tag = "office",
    params(("id" = Uuid, Path, description = "Withdrawal id")),
    responses(
        (status = 200, description = "Processed at the latest market rate"),
        (status = 404, description = "Withdrawal or market rate missing", body = crate::openapi::ErrorBody),
        (status = 409, description = "Not approved", body = crate::openapi::ErrorBody)
    )
)]
pub async fn process_withdrawal(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let row = state.withdrawals.process(id).await?;
    Ok(Json(json!({ "success": true, "withdrawal": row })))
}

#[utoipa::path(
    post, path = "/api/office/withdrawals/{id}/reject", tag = "office",
    params(("id" = Uuid, Path, description = "Withdrawal id")),
    responses(
        (status = 200, description = "Rejected; the body is optional"),
        (status = 400, description = "Malformed body", body = crate::openapi::ErrorBody),
        (status = 409, description = "Not pending", body = crate::openapi::ErrorBody)
    )
)]
pub async fn reject_withdrawal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    OptionalApiJson(input): OptionalApiJson<RejectWithdrawalRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = input.unwrap_or_default();
    let row = state.withdrawals.reject(id, req).await?;
    Ok(Json(json!({ "success": true, "withdrawal": row })))
}

#[utoipa::path(
    post, path = "/api/office/assignments", tag = "office",
    request_body = crate::openapi::AssignStaffDoc,
    responses((status = 200, description = "Assignment saved"))
)]
pub async fn assign_staff(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<AssignStaffRequest>,
) -> Result<Json<Value>, ApiError> {
    let saved = state.assignments.assign(input).await?;
    Ok(Json(json!({ "success": true, "assignment": saved })))
}

#[utoipa::path(
    post, path = "/api/office/enrollments", tag = "office",
    request_body = crate::openapi::EnrollDoc,
    responses((status = 200, description = "Customer enrolled"), (status = 400, description = "Validation Error", body = crate::openapi::ErrorBody))
)]
pub async fn enroll(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<EnrollRequest>,
) -> Result<Json<Value>, ApiError> {
    let row = state.enrollments.enroll(input).await?;
    Ok(Json(json!({ "success": true, "enrollment": row })))
}

#[utoipa::path(
    post, path = "/api/office/customers/add", tag = "office",
    responses((status = 200, description = "Customer added"), (status = 400, description = "Validation Error", body = crate::openapi::ErrorBody))
)]
pub async fn add_customer(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<OfficeCustomerRequest>,
) -> Result<Json<Value>, ApiError> {
    let customer_id = state.customers.office_add(input).await?;
    Ok(Json(json!({ "success": true, "customerId": customer_id })))
}

#[utoipa::path(get, path = "/api/office/stats", tag = "office", responses((status = 200, description = "Live office figures")))]
pub async fn office_stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.stats.office_stats().await?))
}
