use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{Principal, TokenService};
use crate::database::models::Scope;
use crate::error::ApiError;

/// Attach a [`Principal`] to every request.
///
/// A missing `Authorization` header means `Anonymous`. A header that is not
/// `Bearer <token>`, or a token that doesn't resolve, ends the request with
/// 401 before routing.
pub async fn authenticate(State(tokens): State<TokenService>, mut request: Request, next: Next) -> Response {
    let principal = match bearer_token(request.headers()) {
        Ok(None) => Principal::Anonymous,
        Ok(Some(token)) => match tokens.resolve(&token, Scope::Authentication).await {
            Ok(user) => Principal::User(user),
            Err(err) => return vary(ApiError::from(err).into_response()),
        },
        Err(err) => return vary(err.into_response()),
    };

    request.extensions_mut().insert(principal);
    vary(next.run(request).await)
}

/// `Ok(None)` when no header was sent; a header that isn't `Bearer <token>` is an invalid token.
fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty() && !token.contains(' '))
        .map(|token| Some(token.to_string()))
        .ok_or(ApiError::InvalidAuthenticationToken)
}

fn vary(mut response: Response) -> Response {
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}
