use backend::BackendError;
use models::errors::{FieldErrors, ModelError};
use models::withdrawal::WithdrawalStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(FieldErrors),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    NotFound(String),
    #[error("withdrawal cannot move from {from} to {to}")]
    InvalidTransition { from: WithdrawalStatus, to: WithdrawalStatus },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }

    pub fn not_found(message: impl Into<String>) -> Self { Self::NotFound(message.into()) }

    /// Stable machine-readable tag.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Upstream(_) => "upstream",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InvalidTransition { .. } => "invalid_transition",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::Forbidden(_) => "forbidden",
        }
    }

    /// Wrap a backend failure with a short context prefix, e.g. `Auth Error: ...`.
    pub fn upstream(context: &str) -> impl FnOnce(BackendError) -> ServiceError + '_ {
        move |err| {
            let mapped = ServiceError::from(err);
            match mapped {
                ServiceError::Upstream(msg) => ServiceError::Upstream(format!("{context}: {msg}")),
                other => other,
            }
        }
    }
}

impl From<BackendError> for ServiceError {
    fn from(err: BackendError) -> Self {
        common::metrics::UPSTREAM_ERRORS_TOTAL.inc();
        if err.is_conflict() {
            ServiceError::Conflict(err.to_string())
        } else {
            ServiceError::Upstream(err.to_string())
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Validation(fields) => ServiceError::Validation(fields),
            ModelError::InvalidTransition { from, to } => ServiceError::InvalidTransition { from, to },
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errs: validator::ValidationErrors) -> Self { ServiceError::Validation(errs.into()) }
}
