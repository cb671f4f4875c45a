use axum::{async_trait, extract::FromRequestParts, http::{request::Parts, Extensions}};
use std::convert::Infallible;

use crate::database::models::User;

/// Who is making the request. Attached exactly once by the authenticator.
#[derive(Debug, Clone)]
pub enum Principal {
    Anonymous,
    User(User),
}

impl Principal {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::Anonymous => None,
            Principal::User(user) => Some(user),
        }
    }

    /// The principal attached to a request.
    ///
    /// # Panics
    ///
    /// If the authenticator never ran for this request. Every router built
    /// by [`crate::routes::app`] installs it, so this is a wiring bug.
    pub fn of(extensions: &Extensions) -> &Principal {
        match extensions.get::<Principal>() {
            Some(principal) => principal,
            None => panic!("no principal on request; authenticate middleware is not installed"),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Principal::of(&parts.extensions).clone())
    }
}
