//! Error types
//!
//! `CatalogError` covers start-up configuration problems and aborts the
//! process. `ServiceError` covers everything that can go wrong inside a
//! request and knows how to render itself as an HTTP rejection.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

/// Malformed catalog configuration. Never recoverable at runtime.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog schema declares no dimensions")]
    EmptySchema,

    #[error("catalog schema declares dimension '{0}' more than once")]
    DuplicateDimension(String),

    #[error("invalid dimension name '{0}': must be non-blank and must not be 'dimensions', 'combos', 'video' or contain '_by_'")]
    ReservedDimension(String),

    #[error("entry {key:?} has {found} dimension values, expected {expected}")]
    Arity {
        key: Vec<String>,
        expected: usize,
        found: usize,
    },

    #[error("entry {key:?}: value '{value}' is not allowed for dimension '{dimension}'")]
    DisallowedValue {
        key: Vec<String>,
        dimension: String,
        value: String,
    },

    #[error("invalid dimension value '{0}': must be non-empty and must not contain '|'")]
    InvalidValue(String),

    #[error("unsafe asset filename '{0}'")]
    UnsafeFilename(String),

    #[error("asset filename '{filename}' must end in '.{extension}'")]
    WrongExtension { filename: String, extension: String },

    #[error("duplicate catalog entry for key {0:?}")]
    DuplicateKey(Vec<String>),

    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Request-time rejection. Each variant maps to one stable category.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Incorrect username or password")]
    AuthenticationFailure,

    #[error("{0}")]
    InvalidCredential(String),

    #[error("{0}")]
    ValidationFailure(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn category(&self) -> &'static str {
        match self {
            ServiceError::AuthenticationFailure => "authentication_failure",
            ServiceError::InvalidCredential(_) => "invalid_credential",
            ServiceError::ValidationFailure(_) => "validation_failure",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::AuthenticationFailure | ServiceError::InvalidCredential(_) => {
                StatusCode::UNAUTHORIZED
            }
            ServiceError::ValidationFailure(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let detail = match &self {
            ServiceError::Internal(e) => {
                error!("Internal error while handling request: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(serde_json::json!({
            "error": self.category(),
            "detail": detail,
        }));

        match self {
            ServiceError::InvalidCredential(_) => (
                self.status(),
                [(header::WWW_AUTHENTICATE, "Bearer")],
                body,
            )
                .into_response(),
            _ => (self.status(), body).into_response(),
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_stable() {
        assert_eq!(ServiceError::AuthenticationFailure.category(), "authentication_failure");
        assert_eq!(ServiceError::InvalidCredential("x".into()).category(), "invalid_credential");
        assert_eq!(ServiceError::ValidationFailure("x".into()).category(), "validation_failure");
        assert_eq!(ServiceError::NotFound("x".into()).category(), "not_found");
        assert_eq!(ServiceError::Internal(anyhow::anyhow!("boom")).category(), "internal");
    }

    #[test]
    fn test_invalid_credential_sets_challenge_header() {
        let response = ServiceError::InvalidCredential("Invalid token".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    }

    #[test]
    fn test_internal_error_hides_cause() {
        let err = ServiceError::Internal(anyhow::anyhow!("secret=hunter2"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
