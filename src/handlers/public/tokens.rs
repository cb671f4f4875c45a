// handlers/public/tokens.rs - POST /v1/tokens/authentication handler

use axum::extract::State;
use chrono::Duration;
use serde::Deserialize;

use crate::api::JsonBody;
use crate::auth::password::verify_blocking;
use crate::database::models::{validate_email, validate_password, Scope};
use crate::database::StoreError;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validator::Validator;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/**
 * POST /v1/tokens/authentication - Exchange credentials for a bearer token
 *
 * Any earlier authentication tokens for the user are revoked, so at most one
 * login is live at a time.
 *
 * Expected Output (201):
 * ```json
 * { "authentication_token": { "token": "<26 chars>", "expiry": "2026-01-01T00:00:00Z" } }
 * ```
 */
pub async fn create_authentication_token(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<LoginInput>,
) -> ApiResult {
    let mut v = Validator::new();
    validate_email(&mut v, &input.email);
    validate_password(&mut v, &input.password);
    v.finish()?;

    let user = match state.stores.users.get_by_email(&input.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(ApiError::InvalidCredentials),
        Err(other) => return Err(other.into()),
    };

    let matches = verify_blocking(state.hasher.clone(), input.password, user.password_hash.clone()).await?;
    if !matches {
        return Err(ApiError::InvalidCredentials);
    }

    state.tokens.revoke_all(user.id, Scope::Authentication).await?;

    let ttl = Duration::seconds(state.config.tokens.authentication_ttl_secs);
    let token = state.tokens.issue(user.id, ttl, Scope::Authentication).await?;

    Ok(ApiResponse::created("authentication_token", token))
}
