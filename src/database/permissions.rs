use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;

use super::models::Permissions;
use super::{bounded, PermissionStore, StoreError};

pub struct PgPermissionStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgPermissionStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl PermissionStore for PgPermissionStore {
    async fn all_for_user(&self, user_id: i64) -> Result<Permissions, StoreError> {
        let query = r#"
            SELECT permissions.code
            FROM permissions
            INNER JOIN users_permissions ON users_permissions.permission_id = permissions.id
            WHERE users_permissions.user_id = $1
        "#;

        let codes: Vec<String> = bounded(self.timeout, async {
            Ok::<_, StoreError>(sqlx::query_scalar(query)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?)
        })
        .await?;

        Ok(codes.into_iter().collect())
    }

    async fn add_for_user(&self, user_id: i64, codes: &[&str]) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO users_permissions
            SELECT $1, permissions.id FROM permissions WHERE permissions.code = ANY($2)
        "#;

        let codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        bounded(self.timeout, async {
            sqlx::query(query)
                .bind(user_id)
                .bind(&codes)
                .execute(&self.pool)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}
