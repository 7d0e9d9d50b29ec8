//! Repositories for database operations
//!
//! Each entity family gets its own narrow trait so that callers depend only
//! on the capability they use and tests can mock each one independently.
//! The PostgreSQL adapters live in the submodules.

use std::sync::Arc;

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::PgPool;

use crate::feed::FeedQuery;
use crate::models::{Comment, FeedItem, NewComment, NewPost, Post, Role, User};

pub mod comments;
pub mod followers;
pub mod posts;
pub mod roles;
pub mod users;

#[cfg(test)]
pub mod memory;

pub use comments::PgCommentRepository;
pub use followers::PgFollowerRepository;
pub use posts::PgPostRepository;
pub use roles::PgRoleRepository;
pub use users::PgUserRepository;

/// Read access to user records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID, joined with its role
    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<User>>;
}

/// Read access to role reference data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Find a role by its unique name
    async fn get_by_name(&self, name: &str) -> DatabaseResult<Option<Role>>;
}

/// Post persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post and return it with its generated fields
    async fn create(&self, new_post: &NewPost) -> DatabaseResult<Post>;

    /// Find a post by ID
    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<Post>>;

    /// Write title and content if the stored version still equals
    /// `post.version`, returning the post with its bumped version.
    ///
    /// Fails with `DatabaseError::NotFound` when no row matched.
    async fn update(&self, post: &Post) -> DatabaseResult<Post>;

    /// Delete a post by ID. Fails with `DatabaseError::NotFound` when absent.
    async fn delete(&self, id: i64) -> DatabaseResult<()>;

    /// Posts by the user or by accounts the user follows
    async fn get_user_feed(&self, user_id: i64, query: &FeedQuery)
    -> DatabaseResult<Vec<FeedItem>>;
}

/// Comment persistence. Comments are append-only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, new_comment: &NewComment) -> DatabaseResult<Comment>;

    /// Comments of a post, newest first
    async fn get_by_post_id(&self, post_id: i64) -> DatabaseResult<Vec<Comment>>;
}

/// Follower edges
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FollowerRepository: Send + Sync {
    /// Record that `follower_id` follows `user_id`.
    ///
    /// Fails with `DatabaseError::UniqueViolation` if the edge already exists
    /// and `DatabaseError::ForeignKeyViolation` if either user is unknown.
    async fn follow(&self, follower_id: i64, user_id: i64) -> DatabaseResult<()>;

    /// Remove the edge. Fails with `DatabaseError::NotFound` when absent.
    async fn unfollow(&self, follower_id: i64, user_id: i64) -> DatabaseResult<()>;
}

/// The full set of entity stores
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub followers: Arc<dyn FollowerRepository>,
}

impl Storage {
    /// Storage backed by PostgreSQL
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            roles: Arc::new(PgRoleRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            comments: Arc::new(PgCommentRepository::new(pool.clone())),
            followers: Arc::new(PgFollowerRepository::new(pool)),
        }
    }
}
