//! Post and comment operations
//!
//! Mutations of an existing post look the post up first, then ask the
//! [`Authorizer`] whether the caller may act on it given the post's owner.

use common::error::DatabaseError;
use tracing::{info, warn};

use crate::authorization::{Authorizer, ROLE_ADMIN, ROLE_MODERATOR, ROLE_USER};
use crate::context::RequestContext;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Comment, CreateCommentRequest, CreatePostRequest, NewComment, NewPost, Post,
    PostWithComments, UpdatePostRequest, User,
};
use crate::repositories::Storage;

const MAX_TITLE_LEN: usize = 100;
const MAX_CONTENT_LEN: usize = 1000;

fn validate_text(field: &str, value: &str, max: usize) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(ApiError::Validation(format!(
            "{field} must be at most {max} characters long"
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct PostService {
    storage: Storage,
    authorizer: Authorizer,
}

impl PostService {
    pub fn new(storage: Storage, authorizer: Authorizer) -> Self {
        Self {
            storage,
            authorizer,
        }
    }

    async fn load(&self, ctx: &RequestContext, id: i64) -> ApiResult<Post> {
        ctx.bounded(self.storage.posts.get_by_id(id))
            .await??
            .ok_or_else(|| ApiError::NotFound(format!("post {id} not found")))
    }

    /// Fail with `Forbidden` unless `caller` owns `post` or holds `role`
    async fn guard(
        &self,
        ctx: &RequestContext,
        caller: &User,
        post: &Post,
        role: &str,
    ) -> ApiResult<()> {
        if self
            .authorizer
            .authorize(ctx, caller, post.user_id, role)
            .await?
        {
            Ok(())
        } else {
            warn!(
                "User {} denied '{}' access to post {}",
                caller.id, role, post.id
            );
            Err(ApiError::Forbidden)
        }
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        caller: &User,
        request: CreatePostRequest,
    ) -> ApiResult<Post> {
        validate_text("title", &request.title, MAX_TITLE_LEN)?;
        validate_text("content", &request.content, MAX_CONTENT_LEN)?;

        let mut tags: Vec<String> = Vec::new();
        for tag in request.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        let new_post = NewPost {
            title: request.title,
            content: request.content,
            user_id: caller.id,
            tags,
        };

        let post = ctx.bounded(self.storage.posts.create(&new_post)).await??;
        info!("User {} created post {}", caller.id, post.id);
        Ok(post)
    }

    pub async fn get(&self, ctx: &RequestContext, id: i64) -> ApiResult<PostWithComments> {
        let post = self.load(ctx, id).await?;
        let comments = ctx
            .bounded(self.storage.comments.get_by_post_id(id))
            .await??;
        Ok(PostWithComments { post, comments })
    }

    /// Apply a partial update if `request.version` is still current
    pub async fn update(
        &self,
        ctx: &RequestContext,
        caller: &User,
        id: i64,
        request: UpdatePostRequest,
    ) -> ApiResult<Post> {
        let mut post = self.load(ctx, id).await?;
        self.guard(ctx, caller, &post, ROLE_MODERATOR).await?;

        if let Some(title) = request.title {
            validate_text("title", &title, MAX_TITLE_LEN)?;
            post.title = title;
        }
        if let Some(content) = request.content {
            validate_text("content", &content, MAX_CONTENT_LEN)?;
            post.content = content;
        }
        post.version = request.version;

        match ctx.bounded(self.storage.posts.update(&post)).await? {
            Ok(updated) => {
                info!("User {} updated post {} to version {}", caller.id, id, updated.version);
                Ok(updated)
            }
            Err(DatabaseError::NotFound) => Err(ApiError::Conflict(format!(
                "post {id} was modified concurrently"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, ctx: &RequestContext, caller: &User, id: i64) -> ApiResult<()> {
        let post = self.load(ctx, id).await?;
        self.guard(ctx, caller, &post, ROLE_ADMIN).await?;

        match ctx.bounded(self.storage.posts.delete(id)).await? {
            Ok(()) => {
                info!("User {} deleted post {}", caller.id, id);
                Ok(())
            }
            Err(DatabaseError::NotFound) => Err(ApiError::NotFound(format!("post {id} not found"))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn comment(
        &self,
        ctx: &RequestContext,
        caller: &User,
        post_id: i64,
        request: CreateCommentRequest,
    ) -> ApiResult<Comment> {
        let post = self.load(ctx, post_id).await?;
        self.guard(ctx, caller, &post, ROLE_USER).await?;
        validate_text("content", &request.content, MAX_CONTENT_LEN)?;

        let new_comment = NewComment {
            post_id,
            user_id: caller.id,
            content: request.content,
        };

        Ok(ctx
            .bounded(self.storage.comments.create(&new_comment))
            .await??)
    }
}
