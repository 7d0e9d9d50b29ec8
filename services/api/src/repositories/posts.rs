//! PostgreSQL post repository

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::debug;

use super::PostRepository;
use crate::feed::{FeedQuery, build_feed_query};
use crate::models::{FeedItem, NewPost, Post, PostAuthor};

/// Post repository
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    /// Create a new post repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn post_from_row(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        user_id: row.get("user_id"),
        tags: row.get("tags"),
        version: row.get("version"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn feed_item_from_row(row: &PgRow) -> FeedItem {
    FeedItem {
        post: post_from_row(row),
        comments_count: row.get("comments_count"),
        user: PostAuthor {
            username: row.get("username"),
            email: row.get("email"),
        },
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn create(&self, new_post: &NewPost) -> DatabaseResult<Post> {
        debug!("Creating post for user {}", new_post.user_id);

        let row = sqlx::query(
            r#"
            INSERT INTO posts (title, content, user_id, tags)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, content, user_id, tags, version, created_at, updated_at
            "#,
        )
        .bind(&new_post.title)
        .bind(&new_post.content)
        .bind(new_post.user_id)
        .bind(&new_post.tags)
        .fetch_one(&self.pool)
        .await?;

        Ok(post_from_row(&row))
    }

    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<Post>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, content, user_id, tags, version, created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    async fn update(&self, post: &Post) -> DatabaseResult<Post> {
        debug!("Updating post {} at version {}", post.id, post.version);

        let row = sqlx::query(
            r#"
            UPDATE posts
            SET title = $1, content = $2, version = version + 1, updated_at = now()
            WHERE id = $3 AND version = $4
            RETURNING id, title, content, user_id, tags, version, created_at, updated_at
            "#,
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.id)
        .bind(post.version)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(post_from_row).ok_or(DatabaseError::NotFound)
    }

    async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }

        Ok(())
    }

    async fn get_user_feed(
        &self,
        user_id: i64,
        query: &FeedQuery,
    ) -> DatabaseResult<Vec<FeedItem>> {
        debug!("Loading feed for user {}: {:?}", user_id, query);

        let mut builder = build_feed_query(user_id, query);
        let rows = builder.build().fetch_all(&self.pool).await?;

        Ok(rows.iter().map(feed_item_from_row).collect())
    }
}
