use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put, MethodRouter},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{self, protected::movies, public};
use crate::middleware::{authenticate, catch_panic, rate_limit, require_permission};
use crate::state::AppState;

pub const MOVIES_READ: &str = "movies:read";
pub const MOVIES_WRITE: &str = "movies:write";

/// The full application: the request gate in front of every route.
///
/// Layers run outermost first: trace, CORS, panic containment, rate limiter,
/// authenticator, then the router and any per-route access guard.
pub fn app(state: AppState) -> Router {
    with_gate(routes(&state), &state)
}

/// Wrap any router in the request gate. Tests use this to mount extra routes.
pub fn with_gate(router: Router<AppState>, state: &AppState) -> Router {
    router
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(state.tokens.clone(), authenticate))
        .layer(from_fn_with_state(state.limiter.clone(), rate_limit))
        .layer(catch_panic())
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors(state))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone())
}

fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/healthcheck", resource(get(public::healthcheck::healthcheck)))
        .route(
            "/v1/movies",
            resource(
                require_permission(state, MOVIES_READ, get(movies::list_movies))
                    .merge(require_permission(state, MOVIES_WRITE, post(movies::create_movie))),
            ),
        )
        .route(
            "/v1/movies/:id",
            resource(
                require_permission(state, MOVIES_READ, get(movies::show_movie)).merge(require_permission(
                    state,
                    MOVIES_WRITE,
                    put(movies::update_movie).delete(movies::delete_movie),
                )),
            ),
        )
        .route("/v1/users", resource(post(public::users::register_user)))
        .route("/v1/users/activated", resource(put(public::users::activate_user)))
        .route(
            "/v1/tokens/authentication",
            resource(post(public::tokens::create_authentication_token)),
        )
}

/// Unsupported methods on a known path get the JSON 405 envelope.
pub fn resource(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(handlers::method_not_allowed)
}

fn cors(state: &AppState) -> CorsLayer {
    let security = &state.config.security;
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}
