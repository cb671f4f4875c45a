// handlers/public/users/activate.rs - PUT /v1/users/activated handler

use axum::extract::State;
use serde::Deserialize;

use crate::api::JsonBody;
use crate::auth::tokens::validate_plaintext;
use crate::auth::TokenError;
use crate::database::models::Scope;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validator::Validator;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivateInput {
    #[serde(default)]
    pub token: String,
}

/// PUT /v1/users/activated - Activate the account an activation token belongs to
///
/// Consumes the token: every activation token for the user is revoked afterwards.
pub async fn activate_user(State(state): State<AppState>, JsonBody(input): JsonBody<ActivateInput>) -> ApiResult {
    let mut v = Validator::new();
    validate_plaintext(&mut v, &input.token);
    v.finish()?;

    let mut user = match state.tokens.resolve(&input.token, Scope::Activation).await {
        Ok(user) => user,
        Err(TokenError::NotFound | TokenError::Malformed) => {
            return Err(ApiError::invalid_field("token", "invalid or expired activation token"))
        }
        Err(other) => return Err(other.into()),
    };

    user.activated = true;
    let user = state.stores.users.update(&user).await?;

    state.tokens.revoke_all(user.id, Scope::Activation).await?;

    tracing::info!(user_id = user.id, "activated user");
    Ok(ApiResponse::ok("user", user))
}
