//! Typed HTTP clients for the hosted backend: table REST, auth admin and the
//! remote function endpoint. Every privileged call carries the service-role
//! key; only password sign-in uses the anon key.

pub mod auth_admin;
pub mod error;
pub mod functions;
pub mod query;
pub mod table;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use auth_admin::{AuthAdminClient, SignInSession};
pub use error::BackendError;
pub use functions::FunctionClient;
pub use query::Query;
pub use table::TableClient;

pub type BackendResult<T> = Result<T, BackendError>;

pub const DEFAULT_FUNCTION: &str = "admin-action";

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub url: String,
    pub anon_key: String,
    pub service_role_key: String,
    pub function_name: String,
    pub timeout: Duration,
}

impl BackendSettings {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            service_role_key: service_role_key.into(),
            function_name: DEFAULT_FUNCTION.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

struct Inner {
    http: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
    function_name: String,
}

/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct Backend {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").field("base_url", &self.inner.base_url).finish_non_exhaustive()
    }
}

impl Backend {
    pub fn new(settings: BackendSettings) -> BackendResult<Self> {
        let base_url = settings.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(BackendError::Config("backend url is empty".into()));
        }
        let http = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url,
                anon_key: settings.anon_key,
                service_key: settings.service_role_key,
                function_name: settings.function_name,
            }),
        })
    }

    pub fn base_url(&self) -> &str { &self.inner.base_url }

    pub fn table(&self, name: &str) -> TableClient { TableClient::new(self.clone(), name) }

    pub fn auth_admin(&self) -> AuthAdminClient { AuthAdminClient::new(self.clone()) }

    pub fn functions(&self) -> FunctionClient { FunctionClient::new(self.clone(), &self.inner.function_name) }

    /// `POST /rest/v1/rpc/{name}`
    #[tracing::instrument(skip(self, args), fields(rpc = name))]
    pub async fn rpc<A: Serialize + ?Sized, T: DeserializeOwned>(&self, name: &str, args: &A) -> BackendResult<T> {
        let url = format!("{}/rest/v1/rpc/{}", self.inner.base_url, name);
        let resp = self.privileged(Method::POST, &url).json(args).send().await?;
        decode(resp).await
    }

    pub(crate) fn privileged(&self, method: Method, url: &str) -> RequestBuilder {
        self.keyed(method, url, &self.inner.service_key)
    }

    pub(crate) fn public(&self, method: Method, url: &str) -> RequestBuilder {
        self.keyed(method, url, &self.inner.anon_key)
    }

    fn keyed(&self, method: Method, url: &str, key: &str) -> RequestBuilder {
        self.inner
            .http
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(key)
    }
}

/// Map a response to `T`, or to `BackendError::Api` on a non-2xx status.
pub(crate) async fn decode<T: DeserializeOwned>(resp: Response) -> BackendResult<T> {
    let resp = ensure_success(resp).await?;
    let bytes = resp.bytes().await?;
    let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
    serde_json::from_slice(body).map_err(|e| BackendError::Decode(e.to_string()))
}

pub(crate) async fn ensure_success(resp: Response) -> BackendResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let err = BackendError::from_body(status.as_u16(), &body);
    tracing::debug!(status = status.as_u16(), error = %err, "backend call failed");
    Err(err)
}
