// handlers/protected/movies/list.rs - GET /v1/movies handler

use axum::extract::{Query, State};
use std::collections::HashMap;

use super::SORT_SAFELIST;
use crate::api::QueryParams;
use crate::database::models::MovieQuery;
use crate::filter::Filters;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validator::Validator;

/**
 * GET /v1/movies - Search, sort and paginate the catalogue
 *
 * Query parameters: `title` (full-text words), `genres` (comma separated,
 * all must match), `page`, `page_size`, `sort` (see [`SORT_SAFELIST`]).
 */
pub async fn list_movies(
    State(state): State<AppState>,
    query: Query<HashMap<String, String>>,
) -> ApiResult {
    let params = QueryParams::new(query);
    let mut v = Validator::new();

    let query = MovieQuery {
        title: params.string("title", ""),
        genres: params.csv("genres"),
        filters: Filters {
            page: params.int("page", 1, &mut v),
            page_size: params.int("page_size", 20, &mut v),
            sort: params.string("sort", "id"),
            sort_safelist: SORT_SAFELIST,
        },
    };

    query.filters.validate(&mut v);
    v.finish()?;

    let (movies, metadata) = state.stores.movies.list(&query).await?;
    Ok(ApiResponse::ok("movies", movies).with("metadata", metadata))
}
