pub mod manager;
pub mod memory;
pub mod models;
pub mod movies;
pub mod permissions;
pub mod tokens;
pub mod users;

use async_trait::async_trait;
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::filter::Metadata;
use models::{Movie, MovieQuery, NewMovie, NewUser, Permissions, Scope, TokenRecord, User};

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("edit conflict")]
    EditConflict,

    #[error("a user with this email address already exists")]
    DuplicateEmail,

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(&self, record: &TokenRecord) -> Result<(), StoreError>;

    /// Record with this hash and scope, whether or not it has expired.
    async fn find(&self, hash: &[u8], scope: Scope) -> Result<Option<TokenRecord>, StoreError>;

    async fn delete_all_for_user(&self, user_id: i64, scope: Scope) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    async fn get(&self, id: i64) -> Result<User, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Saves `user` if its version is still current; returns the stored copy with the bumped version.
    async fn update(&self, user: &User) -> Result<User, StoreError>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn all_for_user(&self, user_id: i64) -> Result<Permissions, StoreError>;

    async fn add_for_user(&self, user_id: i64, codes: &[&str]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn insert(&self, movie: NewMovie) -> Result<Movie, StoreError>;

    async fn get(&self, id: i64) -> Result<Movie, StoreError>;

    async fn update(&self, movie: &Movie) -> Result<Movie, StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    async fn list(&self, query: &MovieQuery) -> Result<(Vec<Movie>, Metadata), StoreError>;
}

/// Every store the application talks to, behind trait objects so handlers
/// don't care whether Postgres or memory is underneath.
#[derive(Clone)]
pub struct Stores {
    pub movies: Arc<dyn MovieStore>,
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub permissions: Arc<dyn PermissionStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            movies: Arc::new(movies::PgMovieStore::new(pool.clone(), query_timeout)),
            users: Arc::new(users::PgUserStore::new(pool.clone(), query_timeout)),
            tokens: Arc::new(tokens::PgTokenStore::new(pool.clone(), query_timeout)),
            permissions: Arc::new(permissions::PgPermissionStore::new(pool, query_timeout)),
        }
    }

    pub fn memory() -> Self {
        Self {
            movies: Arc::new(memory::MemoryMovieStore::default()),
            users: Arc::new(memory::MemoryUserStore::default()),
            tokens: Arc::new(memory::MemoryTokenStore::default()),
            permissions: Arc::new(memory::MemoryPermissionStore::default()),
        }
    }
}

/// Run a store call, failing with `Timeout` if it takes longer than `limit`.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}
