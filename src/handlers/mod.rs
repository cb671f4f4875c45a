// handlers/mod.rs - Route handlers grouped by access tier
//
// Public (no principal required) → Protected (permission-gated via middleware::access)

pub mod protected;
pub mod public;

use axum::http::Method;

use crate::error::ApiError;

/// Router-wide fallback for unknown paths
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Per-resource fallback for methods the resource doesn't route
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}
