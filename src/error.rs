// HTTP API Error Types
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::auth::TokenError;
use crate::database::StoreError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 400 Bad Request
    #[error("{0}")]
    BadRequest(String),

    // 401 Unauthorized
    #[error("invalid authentication credentials")]
    InvalidCredentials,
    #[error("invalid or missing authentication token")]
    InvalidAuthenticationToken,
    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    // 403 Forbidden
    #[error("your user account must be activated to access this resource")]
    InactiveAccount,
    #[error("your user account doesn't have the necessary permissions to access this resource")]
    NotPermitted,

    // 404 Not Found
    #[error("the requested resource could not be found")]
    NotFound,

    // 405 Method Not Allowed
    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),

    // 409 Conflict
    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    // 422 Unprocessable Entity
    #[error("failed validation")]
    FailedValidation(BTreeMap<String, String>),

    // 429 Too Many Requests
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    // 500 Internal Server Error; the source is logged, never rendered
    #[error("the server encountered a problem and could not process your request")]
    Internal(anyhow::Error),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials
            | ApiError::InvalidAuthenticationToken
            | ApiError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ApiError::InactiveAccount | ApiError::NotPermitted => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::EditConflict => StatusCode::CONFLICT,
            ApiError::FailedValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::FailedValidation(field_errors) => json!({ "error": field_errors }),
            _ => json!({ "error": self.to_string() }),
        }
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal(err.into())
    }

    pub fn failed_validation(field_errors: BTreeMap<String, String>) -> Self {
        ApiError::FailedValidation(field_errors)
    }

    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: &str) -> Self {
        let mut field_errors = BTreeMap::new();
        field_errors.insert(field.to_string(), message.to_string());
        ApiError::FailedValidation(field_errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::EditConflict => ApiError::EditConflict,
            other => ApiError::internal(other),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed | TokenError::NotFound => ApiError::InvalidAuthenticationToken,
            TokenError::Store(e) => e.into(),
            TokenError::Entropy(e) => ApiError::internal(e),
        }
    }
}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(source) = &self {
            // Don't expose internal errors to clients
            tracing::error!(error = ?source, "internal server error");
        }

        let status = self.status_code();
        let mut response = (status, Json(self.to_json())).into_response();

        if matches!(self, ApiError::InvalidAuthenticationToken) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}
