//! Cache-aside user resolution
//!
//! The durable store is authoritative; the cache only sheds read load. Any
//! cache failure, including a cancelled or undecodable read, is a miss, and a
//! failed write-back is logged and dropped.

use std::sync::Arc;

use common::error::DatabaseError;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::UserCache;
use crate::context::{Cancelled, RequestContext};
use crate::models::User;
use crate::repositories::UserRepository;

/// Failures surfaced by [`UserResolver::resolve`]
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("user {0} not found")]
    NotFound(i64),

    #[error("user lookup failed: {0}")]
    Store(#[from] DatabaseError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Resolves user ids to user records through the cache
#[derive(Clone)]
pub struct UserResolver {
    users: Arc<dyn UserRepository>,
    cache: Arc<dyn UserCache>,
}

impl UserResolver {
    pub fn new(users: Arc<dyn UserRepository>, cache: Arc<dyn UserCache>) -> Self {
        Self { users, cache }
    }

    pub async fn resolve(&self, ctx: &RequestContext, id: i64) -> Result<User, ResolveError> {
        match ctx.bounded(self.cache.get(id)).await {
            Ok(Ok(Some(user))) => {
                debug!("User cache hit for {}", id);
                return Ok(user);
            }
            Ok(Ok(None)) => debug!("User cache miss for {}", id),
            Ok(Err(e)) => warn!("User cache read failed for {}: {}", id, e),
            Err(Cancelled) => warn!("User cache read for {} cancelled", id),
        }

        let user = ctx
            .bounded(self.users.get_by_id(id))
            .await??
            .ok_or(ResolveError::NotFound(id))?;

        match ctx.bounded(self.cache.set(&user)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("User cache write failed for {}: {}", id, e),
            Err(Cancelled) => warn!("User cache write for {} cancelled", id),
        }

        Ok(user)
    }
}
