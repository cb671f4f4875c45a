use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::time::Duration;

use super::models::{Movie, MovieQuery, NewMovie, Runtime};
use super::{bounded, MovieStore, StoreError};
use crate::filter::Metadata;

pub struct PgMovieStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgMovieStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

fn movie_from_row(row: &PgRow) -> Result<Movie, sqlx::Error> {
    Ok(Movie {
        id: row.try_get("id")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        title: row.try_get("title")?,
        year: row.try_get("year")?,
        runtime: row.try_get::<Runtime, _>("runtime")?,
        genres: row.try_get("genres")?,
        version: row.try_get("version")?,
    })
}

#[async_trait]
impl MovieStore for PgMovieStore {
    async fn insert(&self, movie: NewMovie) -> Result<Movie, StoreError> {
        let query = r#"
            INSERT INTO movies (title, year, runtime, genres)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at, title, year, runtime, genres, version
        "#;

        bounded(self.timeout, async {
            let row = sqlx::query(query)
                .bind(&movie.title)
                .bind(movie.year)
                .bind(movie.runtime)
                .bind(&movie.genres)
                .fetch_one(&self.pool)
                .await?;
            Ok::<_, StoreError>(movie_from_row(&row)?)
        })
        .await
    }

    async fn get(&self, id: i64) -> Result<Movie, StoreError> {
        // bigserial ids start at 1
        if id < 1 {
            return Err(StoreError::NotFound);
        }

        let query = r#"
            SELECT id, created_at, title, year, runtime, genres, version
            FROM movies
            WHERE id = $1
        "#;

        bounded(self.timeout, async {
            let row = sqlx::query(query)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound)?;
            Ok::<_, StoreError>(movie_from_row(&row)?)
        })
        .await
    }

    async fn update(&self, movie: &Movie) -> Result<Movie, StoreError> {
        let query = r#"
            UPDATE movies
            SET title = $1, year = $2, runtime = $3, genres = $4, version = version + 1
            WHERE id = $5 AND version = $6
            RETURNING id, created_at, title, year, runtime, genres, version
        "#;

        bounded(self.timeout, async {
            let row = sqlx::query(query)
                .bind(&movie.title)
                .bind(movie.year)
                .bind(movie.runtime)
                .bind(&movie.genres)
                .bind(movie.id)
                .bind(movie.version)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::EditConflict)?;
            Ok::<_, StoreError>(movie_from_row(&row)?)
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }

        bounded(self.timeout, async {
            let result = sqlx::query("DELETE FROM movies WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn list(&self, query: &MovieQuery) -> Result<(Vec<Movie>, Metadata), StoreError> {
        let filters = &query.filters;
        // sort_column() only ever yields safelisted names
        let sql = format!(
            r#"
            SELECT count(*) OVER() AS total, id, created_at, title, year, runtime, genres, version
            FROM movies
            WHERE (to_tsvector('simple', title) @@ plainto_tsquery('simple', $1) OR $1 = '')
            AND (genres @> $2 OR $2 = '{{}}')
            ORDER BY {} {}, id ASC
            LIMIT $3 OFFSET $4
            "#,
            filters.sort_column(),
            filters.sort_direction()
        );

        let rows = bounded(self.timeout, async {
            Ok::<_, StoreError>(sqlx::query(&sql)
                .bind(&query.title)
                .bind(&query.genres)
                .bind(filters.limit())
                .bind(filters.offset())
                .fetch_all(&self.pool)
                .await?)
        })
        .await?;

        let mut total: i64 = 0;
        let mut movies = Vec::with_capacity(rows.len());
        for row in &rows {
            total = row.try_get("total")?;
            movies.push(movie_from_row(row)?);
        }

        let total = u32::try_from(total).unwrap_or(u32::MAX);
        let metadata = Metadata::calculate(total, filters.page, filters.page_size);
        Ok((movies, metadata))
    }
}
