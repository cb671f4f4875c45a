// handlers/protected/movies/show.rs - GET /v1/movies/:id handler

use axum::extract::{Path, State};

use crate::api::parse_id;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

pub async fn show_movie(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    let movie = state.stores.movies.get(id).await?;
    Ok(ApiResponse::ok("movie", movie))
}
