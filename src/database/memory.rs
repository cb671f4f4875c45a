//! In-process stores. Used by the test suites and by `--storage memory` for
//! running the API without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::models::{Movie, MovieQuery, NewMovie, NewUser, Permissions, Scope, TokenRecord, User};
use super::{MovieStore, PermissionStore, StoreError, TokenStore, UserStore};
use crate::filter::Metadata;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct MemoryTokenStore {
    records: Mutex<HashMap<(Vec<u8>, Scope), TokenRecord>>,
}

impl MemoryTokenStore {
    /// Every stored record, for assertions about what is (and isn't) persisted.
    pub fn records(&self) -> Vec<TokenRecord> {
        lock(&self.records).values().cloned().collect()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, record: &TokenRecord) -> Result<(), StoreError> {
        lock(&self.records).insert((record.hash.clone(), record.scope), record.clone());
        Ok(())
    }

    async fn find(&self, hash: &[u8], scope: Scope) -> Result<Option<TokenRecord>, StoreError> {
        Ok(lock(&self.records).get(&(hash.to_vec(), scope)).cloned())
    }

    async fn delete_all_for_user(&self, user_id: i64, scope: Scope) -> Result<(), StoreError> {
        lock(&self.records).retain(|_, r| !(r.user_id == user_id && r.scope == scope));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<BTreeMap<i64, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = lock(&self.users);
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let id = users.keys().next_back().map_or(1, |last| last + 1);
        let stored = User {
            id,
            created_at: Utc::now(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            activated: user.activated,
            version: 1,
        };
        users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: i64) -> Result<User, StoreError> {
        lock(&self.users).get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        lock(&self.users)
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        let mut users = lock(&self.users);
        if users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let stored = users
            .get_mut(&user.id)
            .filter(|stored| stored.version == user.version)
            .ok_or(StoreError::EditConflict)?;
        *stored = User {
            version: user.version + 1,
            ..user.clone()
        };
        Ok(stored.clone())
    }
}

#[derive(Default)]
pub struct MemoryPermissionStore {
    grants: Mutex<HashMap<i64, BTreeSet<String>>>,
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn all_for_user(&self, user_id: i64) -> Result<Permissions, StoreError> {
        Ok(lock(&self.grants)
            .get(&user_id)
            .map(|codes| codes.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_for_user(&self, user_id: i64, codes: &[&str]) -> Result<(), StoreError> {
        lock(&self.grants)
            .entry(user_id)
            .or_default()
            .extend(codes.iter().map(|c| c.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryMovieStore {
    movies: Mutex<BTreeMap<i64, Movie>>,
}

impl MemoryMovieStore {
    fn matches(movie: &Movie, query: &MovieQuery) -> bool {
        let title = movie.title.to_lowercase();
        let title_words: Vec<&str> = title.split_whitespace().collect();
        let title_ok = query
            .title
            .to_lowercase()
            .split_whitespace()
            .all(|word| title_words.contains(&word));
        let genres_ok = query.genres.iter().all(|g| movie.genres.contains(g));
        title_ok && genres_ok
    }

    fn compare(column: &str, a: &Movie, b: &Movie) -> Ordering {
        match column {
            "title" => a.title.cmp(&b.title),
            "year" => a.year.cmp(&b.year),
            "runtime" => a.runtime.cmp(&b.runtime),
            _ => a.id.cmp(&b.id),
        }
    }
}

#[async_trait]
impl MovieStore for MemoryMovieStore {
    async fn insert(&self, movie: NewMovie) -> Result<Movie, StoreError> {
        let mut movies = lock(&self.movies);
        let id = movies.keys().next_back().map_or(1, |last| last + 1);
        let stored = Movie {
            id,
            created_at: Utc::now(),
            title: movie.title,
            year: movie.year,
            runtime: movie.runtime,
            genres: movie.genres,
            version: 1,
        };
        movies.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: i64) -> Result<Movie, StoreError> {
        lock(&self.movies).get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update(&self, movie: &Movie) -> Result<Movie, StoreError> {
        let mut movies = lock(&self.movies);
        let stored = movies
            .get_mut(&movie.id)
            .filter(|stored| stored.version == movie.version)
            .ok_or(StoreError::EditConflict)?;
        *stored = Movie {
            version: movie.version + 1,
            ..movie.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        lock(&self.movies).remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn list(&self, query: &MovieQuery) -> Result<(Vec<Movie>, Metadata), StoreError> {
        let filters = &query.filters;
        let column = filters.sort_column();

        let mut matched: Vec<Movie> = lock(&self.movies)
            .values()
            .filter(|m| Self::matches(m, query))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            let primary = Self::compare(column, a, b);
            let primary = if filters.descending() { primary.reverse() } else { primary };
            primary.then(a.id.cmp(&b.id))
        });

        let total = u32::try_from(matched.len()).unwrap_or(u32::MAX);
        let offset = usize::try_from(filters.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(filters.limit()).unwrap_or(0);
        let page: Vec<Movie> = matched.into_iter().skip(offset).take(limit).collect();

        Ok((page, Metadata::calculate(total, filters.page, filters.page_size)))
    }
}
