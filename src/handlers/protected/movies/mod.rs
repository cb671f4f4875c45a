// handlers/protected/movies/mod.rs - Movie catalogue handlers

pub mod create;
pub mod delete;
pub mod list;
pub mod show;
pub mod update;

pub use create::create_movie;
pub use delete::delete_movie;
pub use list::list_movies;
pub use show::show_movie;
pub use update::update_movie;

use serde::Deserialize;

use crate::database::models::Runtime;

/// Body for create and update. Update applies only the fields present.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MovieInput {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub genres: Option<Vec<String>>,
}

/// Values accepted by `?sort=` on the listing endpoint
pub const SORT_SAFELIST: &[&str] = &["id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime"];
