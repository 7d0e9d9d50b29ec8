//! JWT service for session token issuance and validation
//!
//! Tokens are signed with HS256 using a symmetric secret that never leaves
//! this service. They are stateless: a token is valid exactly when the
//! verification predicate holds at the instant of checking, and there is no
//! revocation list.

use anyhow::Result;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

/// The single algorithm tokens may be signed with
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Symmetric signing secret
    pub secret: String,
    /// Audience embedded in issued tokens and required on validation
    pub audience: String,
    /// Issuer embedded in issued tokens and required on validation
    pub issuer: String,
    /// Token lifetime in seconds (default: 3 days)
    pub token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Signing secret (required)
    /// - `JWT_AUDIENCE`: Token audience (default: "social")
    /// - `JWT_ISSUER`: Token issuer (default: "social")
    /// - `JWT_TOKEN_EXPIRY`: Token expiry in seconds (default: 259200)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        let audience = std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "social".to_string());
        let issuer = std::env::var("JWT_ISSUER").unwrap_or_else(|_| "social".to_string());

        let token_expiry = std::env::var("JWT_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "259200".to_string()) // 3 days
            .parse()
            .unwrap_or(259200);

        Ok(JwtConfig {
            secret,
            audience,
            issuer,
            token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID, as a decimal string
    pub sub: String,
    /// Audience
    pub aud: String,
    /// Issuer
    pub iss: String,
    /// Issued at time
    pub iat: u64,
    /// Not valid before
    pub nbf: u64,
    /// Expiration time
    pub exp: u64,
}

impl Claims {
    /// The subject parsed back into a user id
    pub fn subject_id(&self) -> Result<i64, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Malformed)
    }
}

/// Reasons a token could not be issued or was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token could not be signed: {0}")]
    Signing(String),

    #[error("token is malformed")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("token audience does not match")]
    WrongAudience,

    #[error("token issuer does not match")]
    WrongIssuer,

    #[error("token was signed with a disallowed algorithm")]
    WrongAlgorithm,

    #[error("token signature is invalid")]
    BadSignature,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            ErrorKind::InvalidAudience => TokenError::WrongAudience,
            ErrorKind::InvalidIssuer => TokenError::WrongIssuer,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
                TokenError::WrongAlgorithm
            }
            _ => TokenError::Malformed,
        }
    }
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    ///
    /// Fails with [`TokenError::Signing`] when the secret is empty.
    pub fn new(config: JwtConfig) -> Result<Self, TokenError> {
        if config.secret.is_empty() {
            return Err(TokenError::Signing("signing secret is empty".to_string()));
        }

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        // exp and nbf are exact; no clock skew allowance
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);

        Ok(JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    /// Issue a token for a subject with explicit audience, issuer and lifetime
    pub fn issue(
        &self,
        subject_id: i64,
        audience: &str,
        issuer: &str,
        expiry: Duration,
    ) -> Result<String, TokenError> {
        let now = unix_now()?;

        let claims = Claims {
            sub: subject_id.to_string(),
            aud: audience.to_string(),
            iss: issuer.to_string(),
            iat: now,
            nbf: now,
            exp: now + expiry.as_secs(),
        };

        self.sign(&claims)
    }

    /// Issue a token for a subject using the configured audience, issuer and expiry
    pub fn issue_for(&self, subject_id: i64) -> Result<String, TokenError> {
        self.issue(
            subject_id,
            &self.config.audience,
            &self.config.issuer,
            Duration::from_secs(self.config.token_expiry),
        )
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(SIGNING_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                debug!("Token rejected: {}", e);
                TokenError::from(e)
            })?;
        Ok(token_data.claims)
    }

    /// Get the token expiry time in seconds
    pub fn token_expiry(&self) -> u64 {
        self.config.token_expiry
    }
}

fn unix_now() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| TokenError::Signing(format!("Failed to get current time: {}", e)))
}
