//! User profile, follow graph and feed operations

use common::error::DatabaseError;
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::error::{ApiError, ApiResult};
use crate::feed::{FeedParams, FeedQuery};
use crate::models::{FeedItem, User};
use crate::repositories::Storage;
use crate::resolver::UserResolver;

#[derive(Clone)]
pub struct UserService {
    storage: Storage,
    resolver: UserResolver,
}

impl UserService {
    pub fn new(storage: Storage, resolver: UserResolver) -> Self {
        Self { storage, resolver }
    }

    /// Public profile, served through the user cache
    pub async fn profile(&self, ctx: &RequestContext, id: i64) -> ApiResult<User> {
        Ok(self.resolver.resolve(ctx, id).await?)
    }

    pub async fn follow(&self, ctx: &RequestContext, caller: &User, target_id: i64) -> ApiResult<()> {
        if caller.id == target_id {
            return Err(ApiError::Validation("cannot follow yourself".to_string()));
        }

        match ctx
            .bounded(self.storage.followers.follow(caller.id, target_id))
            .await?
        {
            Ok(()) => {
                info!("User {} now follows {}", caller.id, target_id);
                Ok(())
            }
            Err(DatabaseError::UniqueViolation(_)) => Err(ApiError::Conflict(format!(
                "already following user {target_id}"
            ))),
            Err(DatabaseError::ForeignKeyViolation(_)) => {
                Err(ApiError::NotFound(format!("user {target_id} not found")))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn unfollow(
        &self,
        ctx: &RequestContext,
        caller: &User,
        target_id: i64,
    ) -> ApiResult<()> {
        match ctx
            .bounded(self.storage.followers.unfollow(caller.id, target_id))
            .await?
        {
            Ok(()) => {
                info!("User {} unfollowed {}", caller.id, target_id);
                Ok(())
            }
            Err(DatabaseError::NotFound) => Err(ApiError::NotFound(format!(
                "not following user {target_id}"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Validate `params` and load the caller's feed
    pub async fn feed(
        &self,
        ctx: &RequestContext,
        caller_id: i64,
        params: &FeedParams,
    ) -> ApiResult<Vec<FeedItem>> {
        let query = FeedQuery::from_params(params)?;
        debug!("Feed query for user {}: {:?}", caller_id, query);

        Ok(ctx
            .bounded(self.storage.posts.get_user_feed(caller_id, &query))
            .await??)
    }
}
