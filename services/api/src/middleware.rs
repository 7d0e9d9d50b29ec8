//! Authentication middleware for bearer token validation

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::{debug, warn};

use crate::{
    context::RequestContext, error::ApiError, models::User, resolver::ResolveError,
    state::AppState,
};

/// The caller resolved from a valid bearer token
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Authentication middleware
///
/// Validates the bearer token, resolves its subject through the user cache
/// and stores the result as an [`AuthUser`] request extension. The request's
/// [`RequestContext`] is created here, before resolution, and handed to the
/// handler as an extension so the whole request shares one deadline.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = state.request_context();
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthenticated)?;

    let claims = state.jwt_service.validate_token(bearer.token()).map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ApiError::Unauthenticated
    })?;
    let user_id = claims.subject_id().map_err(|_| ApiError::Unauthenticated)?;

    let user = match state.resolver.resolve(&ctx, user_id).await {
        Ok(user) => user,
        Err(ResolveError::NotFound(id)) => {
            warn!("Token subject {} no longer exists", id);
            return Err(ApiError::Unauthenticated);
        }
        Err(e) => return Err(e.into()),
    };

    req.extensions_mut().insert(AuthUser(user));
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
