use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;

use super::models::{Scope, TokenRecord};
use super::{bounded, StoreError, TokenStore};

pub struct PgTokenStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgTokenStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert(&self, record: &TokenRecord) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO tokens (hash, user_id, expiry, scope)
            VALUES ($1, $2, $3, $4)
        "#;

        bounded(self.timeout, async {
            sqlx::query(query)
                .bind(&record.hash)
                .bind(record.user_id)
                .bind(record.expiry)
                .bind(record.scope.as_str())
                .execute(&self.pool)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn find(&self, hash: &[u8], scope: Scope) -> Result<Option<TokenRecord>, StoreError> {
        let query = r#"
            SELECT user_id, expiry
            FROM tokens
            WHERE hash = $1 AND scope = $2
        "#;

        let row: Option<(i64, DateTime<Utc>)> = bounded(self.timeout, async {
            Ok::<_, StoreError>(sqlx::query_as(query)
                .bind(hash)
                .bind(scope.as_str())
                .fetch_optional(&self.pool)
                .await?)
        })
        .await?;

        Ok(row.map(|(user_id, expiry)| TokenRecord {
            hash: hash.to_vec(),
            user_id,
            expiry,
            scope,
        }))
    }

    async fn delete_all_for_user(&self, user_id: i64, scope: Scope) -> Result<(), StoreError> {
        bounded(self.timeout, async {
            sqlx::query("DELETE FROM tokens WHERE scope = $1 AND user_id = $2")
                .bind(scope.as_str())
                .bind(user_id)
                .execute(&self.pool)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}
