use serde_json::Value;
use thiserror::Error;

/// Postgres unique-violation code as surfaced by the REST layer.
const UNIQUE_VIOLATION: &str = "23505";
/// REST layer code for "object requested but zero rows returned".
const NO_ROWS: &str = "PGRST116";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: u16, code: Option<String>, message: String },
    #[error("unexpected backend response: {0}")]
    Decode(String),
    #[error("invalid backend settings: {0}")]
    Config(String),
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            BackendError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        match self {
            BackendError::Api { status, code, .. } => *status == 409 || code.as_deref() == Some(UNIQUE_VIOLATION),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            BackendError::Api { status, code, .. } => *status == 404 || code.as_deref() == Some(NO_ROWS),
            _ => false,
        }
    }

    /// Build from a non-2xx response body. The auth, table and function
    /// endpoints each name the message field differently.
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|v| {
                ["message", "msg", "error_description", "error"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(Value::as_str))
                    .map(str::to_string)
            })
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty() && parsed.is_none()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| format!("backend returned HTTP {status}"));
        let code = parsed.as_ref().and_then(|v| {
            ["code", "error_code"].iter().find_map(|k| match v.get(*k) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
        });
        BackendError::Api { status, code, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_message_from_rest_body() {
        let err = BackendError::from_body(
            409,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint","details":null,"hint":null}"#,
        );
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "duplicate key value violates unique constraint");
    }

    #[test]
    fn picks_msg_from_auth_body() {
        let err = BackendError::from_body(422, r#"{"code":422,"error_code":"phone_exists","msg":"Phone number already registered"}"#);
        assert_eq!(err.to_string(), "Phone number already registered");
        assert_eq!(err.status(), Some(422));
        assert!(!err.is_conflict());
    }

    #[test]
    fn falls_back_to_raw_text_or_status() {
        assert_eq!(BackendError::from_body(502, "Bad Gateway").to_string(), "Bad Gateway");
        assert_eq!(BackendError::from_body(500, "").to_string(), "backend returned HTTP 500");
    }

    #[test]
    fn no_rows_counts_as_not_found() {
        let err = BackendError::from_body(406, r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned"}"#);
        assert!(err.is_not_found());
    }
}
