use models::identity::{Identity, IdentityHandle, NewIdentity};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{decode, ensure_success, Backend, BackendError, BackendResult};

/// Token grant returned by password sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInSession {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: Identity,
}

/// Admin user management under `/auth/v1/admin`.
#[derive(Clone, Debug)]
pub struct AuthAdminClient {
    backend: Backend,
}

impl AuthAdminClient {
    pub(crate) fn new(backend: Backend) -> Self { Self { backend } }

    fn users_url(&self) -> String { format!("{}/auth/v1/admin/users", self.backend.base_url()) }

    /// Create a pre-verified identity.
    #[tracing::instrument(skip(self, identity), fields(handle = identity.handle.as_str()))]
    pub async fn create_user(&self, identity: &NewIdentity) -> BackendResult<Identity> {
        let mut body = json!({
            "password": identity.password,
            "user_metadata": identity.metadata,
            "email_confirm": true,
            "phone_confirm": true,
        });
        match &identity.handle {
            IdentityHandle::Phone(p) => body["phone"] = Value::from(p.as_str()),
            IdentityHandle::Email(e) => body["email"] = Value::from(e.as_str()),
        }
        let resp = self.backend.privileged(Method::POST, &self.users_url()).json(&body).send().await?;
        let raw: Value = decode(resp).await?;
        user_from(raw)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> BackendResult<()> {
        let url = format!("{}/{}", self.users_url(), id);
        let resp = self.backend.privileged(Method::DELETE, &url).send().await?;
        ensure_success(resp).await.map(|_| ())
    }

    /// `None` when the identity does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> BackendResult<Option<Identity>> {
        let url = format!("{}/{}", self.users_url(), id);
        let resp = self.backend.privileged(Method::GET, &url).send().await?;
        match decode::<Value>(resp).await {
            Ok(raw) => user_from(raw).map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Password sign-in with the public key, as an end user would.
    #[tracing::instrument(skip(self, password), fields(handle = handle.as_str()))]
    pub async fn sign_in_with_password(&self, handle: &IdentityHandle, password: &str) -> BackendResult<SignInSession> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.backend.base_url());
        let body = match handle {
            IdentityHandle::Email(e) => json!({ "email": e, "password": password }),
            IdentityHandle::Phone(p) => json!({ "phone": p, "password": password }),
        };
        let resp = self.backend.public(Method::POST, &url).json(&body).send().await?;
        decode(resp).await
    }
}

// Some server versions wrap the user object as `{ "user": {...} }`.
fn user_from(raw: Value) -> BackendResult<Identity> {
    let user = match raw {
        Value::Object(mut map) if map.contains_key("user") && !map.contains_key("id") => {
            map.remove("user").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(user).map_err(|e| BackendError::Decode(e.to_string()))
}
