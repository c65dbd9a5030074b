use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use models::profile::Role;
use serde_json::{json, Value};
use service::sessions::{Claims, LoginRequest, SESSION_COOKIE};
use tracing::{info, warn};

use crate::errors::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

#[utoipa::path(
    post, path = "/api/auth/login", tag = "auth",
    request_body = crate::openapi::LoginRequestDoc,
    responses(
        (status = 200, description = "Signed in; token also set as auth_token cookie"),
        (status = 400, description = "Validation Error", body = crate::openapi::ErrorBody),
        (status = 401, description = "Invalid credentials", body = crate::openapi::ErrorBody),
        (status = 403, description = "Role not allowed for this portal", body = crate::openapi::ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(input): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let session = state.sessions.login(input).await?;
    info!(user_id = %session.user_id, role = session.role.as_str(), "login_succeeded");

    let mut cookie = Cookie::new(SESSION_COOKIE, session.token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(state.cookie_secure);
    cookie.set_same_site(SameSite::Lax);
    let jar = jar.add(cookie);

    Ok((
        jar,
        Json(json!({
            "success": true,
            "token": session.token,
            "user_id": session.user_id,
            "role": session.role,
            "expires_at": session.expires_at,
        })),
    ))
}

#[utoipa::path(post, path = "/api/auth/logout", tag = "auth", responses((status = 200, description = "Cookie cleared")))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");
    (jar.remove(cookie), Json(json!({ "success": true })))
}

#[utoipa::path(
    get, path = "/api/admin/check-auth", tag = "auth",
    responses((status = 200, description = "Session is valid"), (status = 401, description = "Unauthorized"))
)]
pub async fn check_auth(Extension(claims): Extension<Claims>) -> Json<Value> {
    Json(json!({ "authenticated": true, "role": claims.role, "user_id": claims.sub }))
}

/// 读取会话令牌：优先 Authorization: Bearer，其次 auth_token Cookie
fn session_token(req: &Request) -> Result<String, ApiError> {
    if let Some(h) = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return match h.strip_prefix("Bearer ") {
            Some(t) if !t.trim().is_empty() => Ok(t.trim().to_string()),
            _ => {
                warn!(path = %req.uri().path(), "invalid Authorization format (expect Bearer)");
                Err(ApiError::unauthorized("Invalid Authorization header"))
            }
        };
    }
    CookieJar::from_headers(req.headers())
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

async fn authorize(state: &AppState, mut req: Request, next: Next, allowed: fn(Role) -> bool) -> Result<Response, ApiError> {
    let token = session_token(&req)?;
    let claims = state.sessions.verify(&token)?;
    if !allowed(claims.role) {
        warn!(path = %req.uri().path(), user_id = %claims.sub, role = claims.role.as_str(), "role not permitted");
        return Err(ApiError::from(service::ServiceError::Forbidden("Insufficient permissions".into())));
    }
    // claims 注入请求扩展，供后续 handler 读取操作人
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// `/api/admin/**` 仅允许 admin
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, ApiError> {
    authorize(&state, req, next, |role| role == Role::Admin).await
}

/// `/api/office/**` 允许 admin 与各类员工
pub async fn require_office(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, ApiError> {
    authorize(&state, req, next, |role| role.is_office()).await
}
