//! PostgreSQL follower repository

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use tracing::info;

use super::FollowerRepository;

/// Follower repository
#[derive(Clone)]
pub struct PgFollowerRepository {
    pool: PgPool,
}

impl PgFollowerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowerRepository for PgFollowerRepository {
    async fn follow(&self, follower_id: i64, user_id: i64) -> DatabaseResult<()> {
        info!("User {} follows user {}", follower_id, user_id);

        sqlx::query("INSERT INTO followers (user_id, follower_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(follower_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn unfollow(&self, follower_id: i64, user_id: i64) -> DatabaseResult<()> {
        info!("User {} unfollows user {}", follower_id, user_id);

        let result = sqlx::query("DELETE FROM followers WHERE user_id = $1 AND follower_id = $2")
            .bind(user_id)
            .bind(follower_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }

        Ok(())
    }
}
