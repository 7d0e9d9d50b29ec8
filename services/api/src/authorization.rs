//! Ownership-then-role authorization
//!
//! A caller may act on a resource it owns, whatever its role. Otherwise its
//! role level must be at least that of the role the action requires. Role
//! data is only consulted once ownership has been ruled out.

use std::sync::Arc;

use common::error::DatabaseError;
use thiserror::Error;
use tracing::debug;

use crate::context::{Cancelled, RequestContext};
use crate::models::User;
use crate::repositories::RoleRepository;

pub const ROLE_USER: &str = "user";
pub const ROLE_MODERATOR: &str = "moderator";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// The required role is not present in reference data
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    #[error("role lookup failed: {0}")]
    Store(#[from] DatabaseError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Decides whether a caller may mutate a resource
#[derive(Clone)]
pub struct Authorizer {
    roles: Arc<dyn RoleRepository>,
}

impl Authorizer {
    pub fn new(roles: Arc<dyn RoleRepository>) -> Self {
        Self { roles }
    }

    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        caller: &User,
        owner_id: i64,
        required_role: &str,
    ) -> Result<bool, AuthorizationError> {
        if caller.id == owner_id {
            return Ok(true);
        }

        let required = ctx
            .bounded(self.roles.get_by_name(required_role))
            .await??
            .ok_or_else(|| AuthorizationError::UnknownRole(required_role.to_string()))?;

        let allowed = caller.role.level >= required.level;
        debug!(
            "User {} (level {}) vs role '{}' (level {}): {}",
            caller.id,
            caller.role.level,
            required.name,
            required.level,
            if allowed { "allowed" } else { "denied" }
        );

        Ok(allowed)
    }
}
