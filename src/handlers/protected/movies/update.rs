// handlers/protected/movies/update.rs - PUT /v1/movies/:id handler

use axum::{
    extract::{Path, State},
    http::HeaderMap,
};

use super::MovieInput;
use crate::api::{parse_id, JsonBody};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validator::Validator;

/// Clients may pin the version they read; a mismatch is an edit conflict.
const EXPECTED_VERSION: &str = "x-expected-version";

/**
 * PUT /v1/movies/:id - Partial update with optimistic locking
 *
 * Only the fields present in the body change. The store rejects the write
 * with 409 if another update landed since the movie was read.
 */
pub async fn update_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<MovieInput>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let mut movie = state.stores.movies.get(id).await?;

    if let Some(expected) = headers.get(EXPECTED_VERSION) {
        if expected.to_str().ok() != Some(movie.version.to_string().as_str()) {
            return Err(ApiError::EditConflict);
        }
    }

    if let Some(title) = input.title {
        movie.title = title;
    }
    if let Some(year) = input.year {
        movie.year = year;
    }
    if let Some(runtime) = input.runtime {
        movie.runtime = runtime;
    }
    if let Some(genres) = input.genres {
        movie.genres = genres;
    }

    let mut v = Validator::new();
    movie.validate(&mut v);
    v.finish()?;

    let movie = state.stores.movies.update(&movie).await?;
    Ok(ApiResponse::ok("movie", movie))
}
