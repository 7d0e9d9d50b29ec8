//! Authentication service routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use tracing::info;

use crate::{
    AppState,
    error::AuthError,
    models::{RegisterRequest, TokenRequest, TokenResponse},
};

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/authentication/user", post(register_user))
        .route("/authentication/token", post(create_token))
        .route("/users/activate/:token", put(activate_user))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);

    Json(serde_json::json!({
        "status": if database { "ok" } else { "degraded" },
        "service": "auth-service"
    }))
}

/// Register a new, inactive account and send its invitation
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Registration attempt for user: {}", payload.username);

    let response = state.accounts.register(payload).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Exchange email and password for a session token
pub async fn create_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let token = state.accounts.issue_token(payload).await?;

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

pub async fn activate_user(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AuthError> {
    state.accounts.activate(&token).await?;

    Ok(Json(serde_json::json!({"message": "Account activated"})))
}
