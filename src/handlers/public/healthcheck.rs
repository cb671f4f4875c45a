// handlers/public/healthcheck.rs - GET /v1/healthcheck handler

use axum::extract::State;
use serde_json::json;

use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /v1/healthcheck - Report that the API is up, with environment and version
pub async fn healthcheck(State(state): State<AppState>) -> ApiResult {
    Ok(ApiResponse::ok("status", "available").with(
        "system_info",
        json!({
            "environment": state.config.environment.as_str(),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    ))
}
