//! Account model and the registration and login payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account record, including its credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub role_id: i64,
    pub created_at: DateTime<Utc>,
}

/// New account payload for the store; the password is already hashed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Request for account registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Response for account registration
///
/// `token` is the plain invitation token; only its digest is stored.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub token: String,
}

/// Request for a session token
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

/// Response carrying a session token
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
}
