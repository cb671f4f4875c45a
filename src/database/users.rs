use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;

use super::models::{NewUser, User};
use super::{bounded, StoreError, UserStore};

const EMAIL_CONSTRAINT: &str = "users_email_key";

pub struct PgUserStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgUserStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

/// Map the unique-email violation to its own error; everything else passes through.
fn map_write_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.constraint() == Some(EMAIL_CONSTRAINT) => StoreError::DuplicateEmail,
        _ => StoreError::Sqlx(err),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let query = r#"
            INSERT INTO users (name, email, password_hash, activated)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at, name, email, password_hash, activated, version
        "#;

        bounded(self.timeout, async {
            sqlx::query_as::<_, User>(query)
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(user.activated)
                .fetch_one(&self.pool)
                .await
                .map_err(map_write_error)
        })
        .await
    }

    async fn get(&self, id: i64) -> Result<User, StoreError> {
        let query = r#"
            SELECT id, created_at, name, email, password_hash, activated, version
            FROM users
            WHERE id = $1
        "#;

        bounded(self.timeout, async {
            sqlx::query_as::<_, User>(query)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let query = r#"
            SELECT id, created_at, name, email, password_hash, activated, version
            FROM users
            WHERE email = $1
        "#;

        bounded(self.timeout, async {
            sqlx::query_as::<_, User>(query)
                .bind(email)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        let query = r#"
            UPDATE users
            SET name = $1, email = $2, password_hash = $3, activated = $4, version = version + 1
            WHERE id = $5 AND version = $6
            RETURNING id, created_at, name, email, password_hash, activated, version
        "#;

        bounded(self.timeout, async {
            sqlx::query_as::<_, User>(query)
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(user.activated)
                .bind(user.id)
                .bind(user.version)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_write_error)?
                .ok_or(StoreError::EditConflict)
        })
        .await
    }
}
