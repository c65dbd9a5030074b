//! Console sign-in and session tokens.
//!
//! Credentials are checked by the auth subsystem; the console only reads the
//! profile role and issues its own short-lived HS256 token carrying it.

use backend::{Backend, BackendError, Query};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use models::identity::IdentityHandle;
use models::phone::to_e164;
use models::profile::{Profile, Role};
use models::staff::STAFF_EMAIL_DOMAIN;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ServiceError, ServiceResult};

pub const SESSION_COOKIE: &str = "auth_token";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Portal {
    #[default]
    Admin,
    Office,
}

impl Portal {
    pub fn admits(&self, role: Role) -> bool {
        match self {
            Portal::Admin => role == Role::Admin,
            Portal::Office => role.is_office(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default, alias = "username", alias = "phone", alias = "email")]
    #[validate(length(min = 1, message = "Username or phone is required"))]
    pub identifier: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default)]
    pub portal: Portal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub jwt_secret: String,
    pub admin_alias_email: String,
    /// Empty means `office` is treated like any other staff username.
    pub office_alias_email: String,
    pub ttl: Duration,
}

impl SessionSettings {
    pub fn new(jwt_secret: impl Into<String>, admin_alias_email: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            admin_alias_email: admin_alias_email.into(),
            office_alias_email: String::new(),
            ttl: Duration::hours(12),
        }
    }

    pub fn with_office_alias(mut self, email: impl Into<String>) -> Self {
        self.office_alias_email = email.into();
        self
    }
}

#[derive(Clone)]
pub struct SessionIssuer {
    backend: Backend,
    settings: SessionSettings,
}

impl SessionIssuer {
    pub fn new(backend: Backend, settings: SessionSettings) -> Self { Self { backend, settings } }

    pub fn ttl(&self) -> Duration { self.settings.ttl }

    /// `admin` and `office` are shortcuts for the configured mailboxes. Anything with `@`
    /// is an email, anything with letters is a staff username, and the rest must be a
    /// phone number.
    pub fn resolve_handle(&self, identifier: &str) -> ServiceResult<IdentityHandle> {
        let id = identifier.trim();
        if id.eq_ignore_ascii_case("admin") {
            return Ok(IdentityHandle::Email(self.settings.admin_alias_email.clone()));
        }
        if id.eq_ignore_ascii_case("office") && !self.settings.office_alias_email.is_empty() {
            return Ok(IdentityHandle::Email(self.settings.office_alias_email.clone()));
        }
        if id.contains('@') {
            return Ok(IdentityHandle::Email(id.to_lowercase()));
        }
        if id.chars().any(char::is_alphabetic) {
            return Ok(IdentityHandle::Email(format!("{}@{}", id.to_lowercase(), STAFF_EMAIL_DOMAIN)));
        }
        if !id.chars().any(|c| c.is_ascii_digit()) {
            return Err(ServiceError::validation("identifier", "Enter a username, email or phone number"));
        }
        Ok(IdentityHandle::Phone(to_e164(id)))
    }

    #[instrument(skip(self, req), fields(portal = ?req.portal))]
    pub async fn login(&self, req: LoginRequest) -> ServiceResult<IssuedSession> {
        req.validate()?;
        let handle = self.resolve_handle(&req.identifier)?;
        let signed_in = self
            .backend
            .auth_admin()
            .sign_in_with_password(&handle, &req.password)
            .await
            .map_err(|e| match e {
                BackendError::Api { status: 400 | 401 | 422, .. } => {
                    ServiceError::Unauthorized("Invalid login credentials".into())
                }
                other => ServiceError::from(other),
            })?;

        let user_id = signed_in.user.id;
        let profile: Option<Profile> = self
            .backend
            .table("profiles")
            .select_first(&Query::new().select("id,role,full_name").eq("id", user_id))
            .await?;
        let role = profile
            .as_ref()
            .and_then(Profile::role)
            .ok_or_else(|| ServiceError::Forbidden("No role assigned to this account".into()))?;

        if !req.portal.admits(role) {
            warn!(%user_id, role = role.as_str(), "portal access denied");
            return Err(ServiceError::Forbidden(match req.portal {
                Portal::Admin => "Access denied: admin role required".into(),
                Portal::Office => "Access denied: office staff role required".into(),
            }));
        }

        let session = self.issue(user_id, role)?;
        info!(%user_id, role = role.as_str(), "session_issued");
        Ok(session)
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> ServiceResult<IssuedSession> {
        let now = Utc::now();
        let expires_at = now + self.settings.ttl;
        let claims = Claims { sub: user_id, role, iat: now.timestamp(), exp: expires_at.timestamp() };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.settings.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::Upstream(format!("token error: {e}")))?;
        Ok(IssuedSession { token, user_id, role, expires_at })
    }

    pub fn verify(&self, token: &str) -> ServiceResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &DecodingKey::from_secret(self.settings.jwt_secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|_| ServiceError::Unauthorized("Invalid or expired session".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::BackendSettings;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "test-secret-0123456789";

    fn issuer(server: &MockServer) -> SessionIssuer {
        let backend = Backend::new(BackendSettings::new(server.uri(), "eyJanon", "eyJservice")).unwrap();
        SessionIssuer::new(backend, SessionSettings::new(SECRET, "owner@example.com"))
    }

    async fn mount_sign_in(server: &MockServer, user_id: Uuid, role: &str) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(header("apikey", "eyJanon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "upstream", "user": { "id": user_id }
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", format!("eq.{user_id}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": user_id, "role": role }])))
            .mount(server)
            .await;
    }

    fn login(identifier: &str, portal: Portal) -> LoginRequest {
        LoginRequest { identifier: identifier.into(), password: "secret1".into(), portal }
    }

    fn offline_issuer(settings: SessionSettings) -> SessionIssuer {
        let backend = Backend::new(BackendSettings::new("http://localhost:1", "eyJanon", "eyJservice")).unwrap();
        SessionIssuer::new(backend, settings)
    }

    #[test]
    fn identifiers_resolve_to_handles() {
        let issuer = offline_issuer(SessionSettings::new(SECRET, "owner@example.com"));
        assert_eq!(issuer.resolve_handle("Admin").unwrap(), IdentityHandle::Email("owner@example.com".into()));
        assert_eq!(issuer.resolve_handle(" Meera@Staff.local ").unwrap(), IdentityHandle::Email("meera@staff.local".into()));
        assert_eq!(issuer.resolve_handle("98765 43210").unwrap(), IdentityHandle::Phone("+919876543210".into()));
    }

    #[test]
    fn office_shortcut_uses_configured_mailbox() {
        let issuer = offline_issuer(SessionSettings::new(SECRET, "owner@example.com").with_office_alias("desk@example.com"));
        assert_eq!(issuer.resolve_handle("OFFICE").unwrap(), IdentityHandle::Email("desk@example.com".into()));

        let unconfigured = offline_issuer(SessionSettings::new(SECRET, "owner@example.com"));
        assert_eq!(unconfigured.resolve_handle("office").unwrap(), IdentityHandle::Email("office@staff.local".into()));
    }

    #[test]
    fn bare_usernames_map_to_staff_mailboxes() {
        let issuer = offline_issuer(SessionSettings::new(SECRET, "owner@example.com"));
        assert_eq!(issuer.resolve_handle(" Meera ").unwrap(), IdentityHandle::Email("meera@staff.local".into()));
        assert_eq!(issuer.resolve_handle("ravi2").unwrap(), IdentityHandle::Email("ravi2@staff.local".into()));
    }

    #[test]
    fn identifier_without_digits_or_letters_is_rejected() {
        let issuer = offline_issuer(SessionSettings::new(SECRET, "owner@example.com"));
        let err = issuer.resolve_handle("+ -").unwrap_err();
        match err {
            ServiceError::Validation(fields) => assert!(fields.get("identifier").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_identifier_never_reaches_auth() {
        let server = MockServer::start().await;
        let err = issuer(&server).login(login("---", Portal::Office)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn staff_username_signs_in_through_staff_mailbox() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(body_partial_json(json!({ "email": "meera@staff.local" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "x", "user": { "id": user_id } })))
            .expect(1)
            .mount(&server)
            .await;
        mount_sign_in(&server, user_id, "office_staff").await;

        let session = issuer(&server).login(login("meera", Portal::Office)).await.unwrap();
        assert_eq!(session.role, Role::OfficeStaff);
    }

    #[tokio::test]
    async fn legacy_staff_role_enters_office_portal() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();
        mount_sign_in(&server, user_id, "staff").await;

        let issuer = issuer(&server);
        let session = issuer.login(login("old.staff@example.com", Portal::Office)).await.unwrap();
        assert_eq!(session.role, Role::OfficeStaff);
        let err = issuer.login(login("old.staff@example.com", Portal::Admin)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn admin_alias_signs_in_and_token_verifies() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(body_partial_json(json!({ "email": "owner@example.com" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "x", "user": { "id": user_id } })))
            .expect(1)
            .mount(&server)
            .await;
        mount_sign_in(&server, user_id, "admin").await;

        let issuer = issuer(&server);
        let session = issuer.login(login("admin", Portal::Admin)).await.unwrap();
        let claims = issuer.verify(&session.token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 12 * 3600);
    }

    #[tokio::test]
    async fn office_staff_cannot_enter_admin_portal() {
        let server = MockServer::start().await;
        mount_sign_in(&server, Uuid::new_v4(), "office_staff").await;

        let issuer = issuer(&server);
        let err = issuer.login(login("staff@example.com", Portal::Admin)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert!(issuer.login(login("staff@example.com", Portal::Office)).await.is_ok());
    }

    #[tokio::test]
    async fn customers_are_kept_out_of_office_portal() {
        let server = MockServer::start().await;
        mount_sign_in(&server, Uuid::new_v4(), "customer").await;
        let err = issuer(&server).login(login("9876543210", Portal::Office)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error_description": "Invalid login credentials" })))
            .mount(&server)
            .await;
        let err = issuer(&server).login(login("admin", Portal::Admin)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn tampered_or_foreign_tokens_fail() {
        let backend = Backend::new(BackendSettings::new("http://localhost:1", "eyJanon", "eyJservice")).unwrap();
        let ours = SessionIssuer::new(backend.clone(), SessionSettings::new(SECRET, "a@b.c"));
        let theirs = SessionIssuer::new(backend, SessionSettings::new("another-secret-0123456", "a@b.c"));
        let token = theirs.issue(Uuid::new_v4(), Role::Admin).unwrap().token;
        assert!(matches!(ours.verify(&token), Err(ServiceError::Unauthorized(_))));
        assert!(ours.verify("not.a.token").is_err());
    }

    #[test]
    fn expired_tokens_fail() {
        let backend = Backend::new(BackendSettings::new("http://localhost:1", "eyJanon", "eyJservice")).unwrap();
        let mut settings = SessionSettings::new(SECRET, "a@b.c");
        settings.ttl = Duration::hours(-1);
        let issuer = SessionIssuer::new(backend, settings);
        let token = issuer.issue(Uuid::new_v4(), Role::OfficeStaff).unwrap().token;
        assert!(issuer.verify(&token).is_err());
    }
}
