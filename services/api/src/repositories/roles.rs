//! PostgreSQL role repository

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::PgPool;

use super::RoleRepository;
use crate::models::Role;

/// Role repository
#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn get_by_name(&self, name: &str) -> DatabaseResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, level, description FROM roles WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }
}
