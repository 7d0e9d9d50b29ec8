//! Application state shared across handlers

use std::time::Duration;

use common::jwt::JwtService;
use sqlx::PgPool;

use crate::{
    context::RequestContext, posts::PostService, resolver::UserResolver, users::UserService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: JwtService,
    pub resolver: UserResolver,
    pub posts: PostService,
    pub users: UserService,
    pub request_timeout: Duration,
}

impl AppState {
    /// A fresh deadline for the current request
    pub fn request_context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
    }
}
