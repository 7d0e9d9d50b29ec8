//! Cache tier for user records
//!
//! Entries are serialized [`User`] values under `user:{id}` and expire after
//! [`USER_TTL_SECS`]. There is no invalidation on write; staleness is bounded
//! by the TTL alone.

use anyhow::Result;
use async_trait::async_trait;
use common::cache::RedisPool;

use crate::models::User;

/// Lifetime of a cached user record
pub const USER_TTL_SECS: u64 = 300;

fn user_key(id: i64) -> String {
    format!("user:{id}")
}

/// Key-value cache for user records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserCache: Send + Sync {
    /// `Ok(None)` on a miss; `Err` when the cache itself failed
    async fn get(&self, id: i64) -> Result<Option<User>>;

    async fn set(&self, user: &User) -> Result<()>;
}

/// Redis-backed user cache
#[derive(Clone)]
pub struct RedisUserCache {
    redis: RedisPool,
}

impl RedisUserCache {
    pub fn new(redis: RedisPool) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl UserCache for RedisUserCache {
    async fn get(&self, id: i64) -> Result<Option<User>> {
        match self.redis.get(&user_key(id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        self.redis
            .set(&user_key(user.id), &raw, Some(USER_TTL_SECS))
            .await
    }
}

/// Cache used when the cache tier is switched off: every lookup misses
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledUserCache;

#[async_trait]
impl UserCache for DisabledUserCache {
    async fn get(&self, _id: i64) -> Result<Option<User>> {
        Ok(None)
    }

    async fn set(&self, _user: &User) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::Role;

    #[test]
    fn keys_are_namespaced_by_id() {
        assert_eq!(user_key(42), "user:42");
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = DisabledUserCache;
        let user = User {
            id: 1,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            created_at: Utc::now(),
            is_active: true,
            role: Role {
                id: 1,
                name: "user".to_string(),
                level: 1,
                description: String::new(),
            },
        };

        cache.set(&user).await.unwrap();
        assert_eq!(cache.get(1).await.unwrap(), None);
    }

    #[test]
    fn cached_shape_has_no_password_hash() {
        let user = User {
            id: 7,
            username: "grace".to_string(),
            email: "grace@example.com".to_string(),
            created_at: Utc::now(),
            is_active: true,
            role: Role {
                id: 3,
                name: "admin".to_string(),
                level: 3,
                description: String::new(),
            },
        };

        let raw = serde_json::to_string(&user).unwrap();
        assert!(!raw.contains("password"));
        let back: User = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, user);
    }
}
