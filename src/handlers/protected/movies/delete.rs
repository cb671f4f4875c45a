// handlers/protected/movies/delete.rs - DELETE /v1/movies/:id handler

use axum::extract::{Path, State};

use crate::api::parse_id;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

pub async fn delete_movie(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    state.stores.movies.delete(id).await?;
    Ok(ApiResponse::ok("message", "movie successfully deleted"))
}
