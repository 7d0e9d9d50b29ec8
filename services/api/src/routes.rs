//! API service routes
//!
//! Handlers only unpack the request and call the post and user services. The
//! [`RequestContext`] they pass along is the one the auth middleware created,
//! so token resolution and the handler's own calls share one deadline.

use axum::{
    Extension, Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use crate::{
    context::RequestContext,
    error::ApiError,
    feed::FeedParams,
    middleware::{AuthUser, auth_middleware},
    models::{CreateCommentRequest, CreatePostRequest, UpdatePostRequest},
    state::AppState,
};

/// Numeric `:id` path segment; a malformed id is a JSON validation error
pub struct IdPath(pub i64);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        Ok(IdPath(id))
    }
}

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/posts", post(create_post))
        .route(
            "/posts/:id",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/posts/:id/comments", post(create_comment))
        .route("/users/feed", get(get_feed))
        .route("/users/:id", get(get_user))
        .route("/users/:id/follow", put(follow_user))
        .route("/users/:id/unfollow", put(unfollow_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);

    Json(json!({
        "status": if database { "ok" } else { "degraded" },
        "service": "api-service"
    }))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.create(&ctx, &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.posts.get(&ctx, id).await?))
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    IdPath(id): IdPath,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.posts.update(&ctx, &caller, id, payload).await?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    state.posts.delete(&ctx, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    IdPath(id): IdPath,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.posts.comment(&ctx, &caller, id, payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Posts by the caller and the accounts it follows
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Query(params): Query<FeedParams>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.users.feed(&ctx, caller.id, &params).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.users.profile(&ctx, id).await?))
}

pub async fn follow_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    state.users.follow(&ctx, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unfollow_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    state.users.unfollow(&ctx, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
