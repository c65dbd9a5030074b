use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{decode, Backend, BackendError, BackendResult};

/// Remote function taking `{ action, payload }` envelopes.
#[derive(Clone, Debug)]
pub struct FunctionClient {
    backend: Backend,
    name: String,
}

impl FunctionClient {
    pub(crate) fn new(backend: Backend, name: &str) -> Self { Self { backend, name: name.to_string() } }

    fn url(&self) -> String { format!("{}/functions/v1/{}", self.backend.base_url(), self.name) }

    /// Invoke `action` and return the whole response body.
    /// A body carrying a non-null `error` is an error even on a 2xx status.
    #[tracing::instrument(skip(self, payload), fields(function = %self.name))]
    pub async fn invoke<P: Serialize + ?Sized>(&self, action: &str, payload: &P) -> BackendResult<Value> {
        let envelope = json!({ "action": action, "payload": payload });
        let resp = self.backend.privileged(Method::POST, &self.url()).json(&envelope).send().await?;
        let status = resp.status().as_u16();
        let body: Value = decode(resp).await?;
        match body.get("error") {
            Some(Value::Null) | None => Ok(body),
            Some(err) => Err(BackendError::Api {
                status,
                code: None,
                message: err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string()),
            }),
        }
    }

    /// Invoke and unwrap the `data` member (`null` when absent).
    pub async fn invoke_data<P: Serialize + ?Sized>(&self, action: &str, payload: &P) -> BackendResult<Value> {
        let mut body = self.invoke(action, payload).await?;
        Ok(body.get_mut("data").map(Value::take).unwrap_or(Value::Null))
    }
}
