// handlers/protected/movies/create.rs - POST /v1/movies handler

use axum::{
    extract::State,
    http::{header, HeaderValue},
};

use super::MovieInput;
use crate::api::JsonBody;
use crate::database::models::NewMovie;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validator::Validator;

/// POST /v1/movies - Add a movie; responds 201 with a `Location` header
pub async fn create_movie(State(state): State<AppState>, JsonBody(input): JsonBody<MovieInput>) -> ApiResult {
    let movie = NewMovie {
        title: input.title.unwrap_or_default(),
        year: input.year.unwrap_or_default(),
        runtime: input.runtime.unwrap_or_default(),
        genres: input.genres.unwrap_or_default(),
    };

    let mut v = Validator::new();
    movie.validate(&mut v);
    v.finish()?;

    let movie = state.stores.movies.insert(movie).await?;

    let location = HeaderValue::try_from(format!("/v1/movies/{}", movie.id)).map_err(ApiError::internal)?;
    Ok(ApiResponse::created("movie", movie).header(header::LOCATION, location))
}
