//! User repository for database operations
//!
//! Registration and activation each run in a single transaction so that a
//! user never exists without its invitation, and an invitation is never
//! consumed without the account being activated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;

use crate::models::{NewUser, User};

/// Account store used by the account service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert an inactive user with the default role together with its
    /// invitation, keyed by the token digest.
    async fn create_and_invite(
        &self,
        new_user: &NewUser,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> DatabaseResult<User>;

    async fn get_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    /// Activate the user owning an unexpired invitation and drop all of its
    /// invitations. Fails with `DatabaseError::NotFound` if none matches.
    async fn activate(&self, token_hash: &str) -> DatabaseResult<()>;

    /// Hard delete, used only to undo a registration
    async fn delete(&self, id: i64) -> DatabaseResult<()>;
}

/// User repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        is_active: row.get("is_active"),
        role_id: row.get("role_id"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_and_invite(
        &self,
        new_user: &NewUser,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> DatabaseResult<User> {
        info!("Creating new user: {}", new_user.username);

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, role_id)
            VALUES ($1, $2, $3, (SELECT id FROM roles WHERE name = 'user'))
            RETURNING id, username, email, password_hash, is_active, role_id, created_at
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&mut *tx)
        .await?;
        let user = user_from_row(&row);

        sqlx::query("INSERT INTO user_invitations (token, user_id, expiry) VALUES ($1, $2, $3)")
            .bind(token_hash)
            .bind(user.id)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, is_active, role_id, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn activate(&self, token_hash: &str) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await?;

        let user_id: i64 = sqlx::query(
            r#"
            SELECT u.id
            FROM users u
            JOIN user_invitations i ON i.user_id = u.id
            WHERE i.token = $1 AND i.expiry > now()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| row.get::<i64, _>("id"))
        .ok_or(DatabaseError::NotFound)?;

        sqlx::query("UPDATE users SET is_active = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM user_invitations WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("Activated user {}", user_id);
        Ok(())
    }

    async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }

        Ok(())
    }
}
