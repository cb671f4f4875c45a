use axum::{
    extract::{Request, State},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use std::sync::Arc;

use crate::auth::Principal;
use crate::database::PermissionStore;
use crate::error::ApiError;
use crate::state::AppState;

/// What a route demands of its caller. Each level implies the ones before it:
/// a permission check also requires an activated, authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    Activated,
    Permission(&'static str),
}

impl Requirement {
    pub async fn check(&self, principal: &Principal, permissions: &dyn PermissionStore) -> Result<(), ApiError> {
        let user = principal.user().ok_or(ApiError::AuthenticationRequired)?;
        if *self == Requirement::Authenticated {
            return Ok(());
        }

        if !user.activated {
            return Err(ApiError::InactiveAccount);
        }

        if let Requirement::Permission(code) = self {
            let granted = permissions.all_for_user(user.id).await?;
            if !granted.includes(code) {
                tracing::debug!(user_id = user.id, code, "permission denied");
                return Err(ApiError::NotPermitted);
            }
        }

        Ok(())
    }
}

#[derive(Clone)]
pub struct Gate {
    permissions: Arc<dyn PermissionStore>,
    requirement: Requirement,
}

async fn enforce(State(gate): State<Gate>, request: Request, next: Next) -> Response {
    let principal = Principal::of(request.extensions()).clone();
    if let Err(err) = gate.requirement.check(&principal, gate.permissions.as_ref()).await {
        return err.into_response();
    }
    next.run(request).await
}

fn guard(state: &AppState, requirement: Requirement, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    let gate = Gate {
        permissions: state.stores.permissions.clone(),
        requirement,
    };
    route.route_layer(from_fn_with_state(gate, enforce))
}

pub fn require_authenticated(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    guard(state, Requirement::Authenticated, route)
}

pub fn require_activated(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    guard(state, Requirement::Activated, route)
}

pub fn require_permission(
    state: &AppState,
    code: &'static str,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    guard(state, Requirement::Permission(code), route)
}
