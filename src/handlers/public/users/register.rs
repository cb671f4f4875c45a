// handlers/public/users/register.rs - POST /v1/users handler

use axum::extract::State;
use chrono::Duration;
use serde::Deserialize;

use crate::api::JsonBody;
use crate::auth::password::hash_blocking;
use crate::database::models::{validate_email, validate_name, validate_password, NewUser, Scope};
use crate::database::StoreError;
use crate::error::ApiError;
use crate::mailer;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validator::Validator;

/// Capability every new account starts with
const DEFAULT_PERMISSION: &str = "movies:read";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/**
 * POST /v1/users - Register a new, not yet activated, account
 *
 * Expected Input:
 * ```json
 * { "name": "Alice Smith", "email": "alice@example.com", "password": "pa55word" }
 * ```
 *
 * Responds 202 with `{"user": {...}}`. The activation token is only ever
 * delivered by the welcome email, which is sent in the background.
 */
pub async fn register_user(State(state): State<AppState>, JsonBody(input): JsonBody<RegisterInput>) -> ApiResult {
    let mut v = Validator::new();
    validate_name(&mut v, &input.name);
    validate_email(&mut v, &input.email);
    validate_password(&mut v, &input.password);
    v.finish()?;

    let password_hash = hash_blocking(state.hasher.clone(), input.password).await?;

    let user = state
        .stores
        .users
        .insert(NewUser {
            name: input.name,
            email: input.email,
            password_hash,
            activated: false,
        })
        .await
        .map_err(|err| match err {
            StoreError::DuplicateEmail => {
                ApiError::invalid_field("email", "a user with this email address already exists")
            }
            other => other.into(),
        })?;

    state
        .stores
        .permissions
        .add_for_user(user.id, &[DEFAULT_PERMISSION])
        .await?;

    let ttl = Duration::seconds(state.config.tokens.activation_ttl_secs);
    let token = state.tokens.issue(user.id, ttl, Scope::Activation).await?;

    let message = mailer::welcome(
        &state.config.mailer.sender,
        &user.email,
        user.id,
        &token.plaintext,
        token.expiry,
    );
    let outbox = state.mailer.clone();
    state.background.spawn("welcome_email", async move {
        outbox.send(&message).await.map_err(anyhow::Error::from)
    });

    tracing::info!(user_id = user.id, "registered user");
    Ok(ApiResponse::accepted("user", user))
}
