//! Account lifecycle: registration, activation and credential exchange
//!
//! A registration stores the user and a digest of its invitation token, then
//! mails the plain token. If the mail cannot be sent the user is deleted
//! again so the email and username are free for a retry.

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::error::DatabaseError;
use common::jwt::JwtService;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AuthError;
use crate::mailer::{Invitation, MailConfig, Mailer};
use crate::models::{NewUser, RegisterRequest, RegisterResponse, TokenRequest};
use crate::password::{hash_password_blocking, verify_decoy, verify_password_blocking};
use crate::repositories::UserRepository;
use crate::validation::{validate_email, validate_password, validate_username};

const EMAIL_CONSTRAINT: &str = "users_email_key";
const USERNAME_CONSTRAINT: &str = "users_username_key";

/// Hex SHA-256 digest under which an invitation token is stored
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
    jwt_service: JwtService,
    mail_config: MailConfig,
    frontend_url: String,
    sandbox: bool,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        mailer: Arc<dyn Mailer>,
        jwt_service: JwtService,
        mail_config: MailConfig,
        frontend_url: String,
        sandbox: bool,
    ) -> Self {
        Self {
            users,
            mailer,
            jwt_service,
            mail_config,
            frontend_url,
            sandbox,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse, AuthError> {
        let email = request.email.trim().to_lowercase();
        validate_username(&request.username).map_err(AuthError::Validation)?;
        validate_email(&email).map_err(AuthError::Validation)?;
        validate_password(&request.password).map_err(AuthError::Validation)?;

        let password_hash = hash_password_blocking(request.password).await.map_err(|e| {
            error!("Failed to hash password: {}", e);
            AuthError::InternalServerError
        })?;

        let new_user = NewUser {
            username: request.username,
            email,
            password_hash,
        };

        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::seconds(self.mail_config.invitation_expiry as i64);

        let user = self
            .users
            .create_and_invite(&new_user, &hash_token(&token), expires_at)
            .await
            .map_err(|e| match e {
                e if e.is_unique_violation_of(EMAIL_CONSTRAINT) => {
                    AuthError::Conflict("email already exists".to_string())
                }
                e if e.is_unique_violation_of(USERNAME_CONSTRAINT) => {
                    AuthError::Conflict("username already exists".to_string())
                }
                e => AuthError::Database(e),
            })?;

        let invitation = Invitation {
            username: user.username.clone(),
            email: user.email.clone(),
            activation_url: format!("{}/confirm/{}", self.frontend_url, token),
            sandbox: self.sandbox,
        };

        if let Err(e) = self.mailer.send_invitation(&invitation).await {
            error!("Failed to send invitation to user {}: {}", user.id, e);
            if let Err(e) = self.users.delete(user.id).await {
                error!("Failed to roll back registration of user {}: {}", user.id, e);
            }
            return Err(AuthError::InternalServerError);
        }

        info!("Registered user {} ({})", user.id, user.username);
        Ok(RegisterResponse { user, token })
    }

    /// Exchange credentials of an active account for a session token
    ///
    /// Unknown emails are verified against a decoy hash, so every rejected
    /// attempt costs one Argon2 verification.
    pub async fn issue_token(&self, request: TokenRequest) -> Result<String, AuthError> {
        let email = request.email.trim().to_lowercase();

        let Some(user) = self.users.get_by_email(&email).await? else {
            if let Err(e) = verify_decoy(request.password).await {
                warn!("Decoy password verification failed: {}", e);
            }
            return Err(AuthError::Unauthorized);
        };

        let valid = verify_password_blocking(request.password, user.password_hash.clone())
            .await
            .map_err(|e| {
                error!("Stored password hash for user {} is unusable: {}", user.id, e);
                AuthError::InternalServerError
            })?;
        if !valid {
            return Err(AuthError::Unauthorized);
        }

        if !user.is_active {
            warn!("Token requested for inactive user {}", user.id);
            return Err(AuthError::Unauthorized);
        }

        self.jwt_service.issue_for(user.id).map_err(|e| {
            error!("Failed to issue token for user {}: {}", user.id, e);
            AuthError::InternalServerError
        })
    }

    pub async fn activate(&self, token: &str) -> Result<(), AuthError> {
        match self.users.activate(&hash_token(token)).await {
            Ok(()) => Ok(()),
            Err(DatabaseError::NotFound) => Err(AuthError::NotFound(
                "invitation not found or expired".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use common::jwt::JwtConfig;
    use mockall::predicate::eq;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::mailer::MockMailer;
    use crate::password::hash_password;
    use crate::models::User;
    use crate::repositories::user::MockUserRepository;

    fn jwt() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test-secret".to_string(),
            audience: "social".to_string(),
            issuer: "social".to_string(),
            token_expiry: 3600,
        })
        .unwrap()
    }

    fn service(users: MockUserRepository, mailer: MockMailer) -> AccountService {
        AccountService::new(
            Arc::new(users),
            Arc::new(mailer),
            jwt(),
            MailConfig {
                invitation_expiry: 3600,
            },
            "http://front.test".to_string(),
            true,
        )
    }

    fn stored(new_user: &NewUser, is_active: bool) -> User {
        User {
            id: 42,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            is_active,
            role_id: 1,
            created_at: Utc::now(),
        }
    }

    fn registration() -> RegisterRequest {
        RegisterRequest {
            username: "ada".to_string(),
            email: "Ada@Example.com".to_string(),
            password: "analytical".to_string(),
        }
    }

    #[tokio::test]
    async fn register_stores_token_digest_and_mails_plain_token() {
        let stored_hash = Arc::new(Mutex::new(String::new()));

        let mut users = MockUserRepository::new();
        let hash_slot = stored_hash.clone();
        users
            .expect_create_and_invite()
            .times(1)
            .returning(move |new_user, token_hash, _| {
                assert_eq!(new_user.email, "ada@example.com");
                assert_ne!(new_user.password_hash, "analytical");
                *hash_slot.lock().unwrap() = token_hash.to_string();
                Ok(stored(new_user, false))
            });
        users.expect_delete().times(0);

        let mut mailer = MockMailer::new();
        mailer
            .expect_send_invitation()
            .times(1)
            .returning(|invitation| {
                assert!(invitation.activation_url.starts_with("http://front.test/confirm/"));
                assert!(invitation.sandbox);
                Ok(())
            });

        let response = assert_ok!(service(users, mailer).register(registration()).await);

        assert_eq!(*stored_hash.lock().unwrap(), hash_token(&response.token));
        assert_ne!(response.token, *stored_hash.lock().unwrap());
        assert!(!response.user.is_active);
    }

    #[tokio::test]
    async fn failed_mail_deletes_the_new_user() {
        let mut users = MockUserRepository::new();
        users
            .expect_create_and_invite()
            .returning(|new_user, _, _| Ok(stored(new_user, false)));
        users.expect_delete().with(eq(42)).times(1).returning(|_| Ok(()));

        let mut mailer = MockMailer::new();
        mailer
            .expect_send_invitation()
            .returning(|_| Err(anyhow::anyhow!("smtp unavailable")));

        let err = assert_err!(service(users, mailer).register(registration()).await);
        assert!(matches!(err, AuthError::InternalServerError));
    }

    #[tokio::test]
    async fn duplicates_are_conflicts() {
        for (constraint, message) in [
            (EMAIL_CONSTRAINT, "email already exists"),
            (USERNAME_CONSTRAINT, "username already exists"),
        ] {
            let mut users = MockUserRepository::new();
            users
                .expect_create_and_invite()
                .returning(move |_, _, _| Err(DatabaseError::UniqueViolation(constraint.into())));
            let mailer = MockMailer::new();

            let err = assert_err!(service(users, mailer).register(registration()).await);
            assert!(matches!(err, AuthError::Conflict(ref m) if m == message));
        }
    }

    #[tokio::test]
    async fn invalid_registration_never_reaches_the_store() {
        let mut users = MockUserRepository::new();
        users.expect_create_and_invite().times(0);

        let request = RegisterRequest {
            password: "short".to_string(),
            ..registration()
        };
        let err = assert_err!(service(users, MockMailer::new()).register(request).await);
        assert!(matches!(err, AuthError::Validation(_)));
    }

    fn account(password: &str, is_active: bool) -> User {
        User {
            id: 7,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: hash_password(password).unwrap(),
            is_active,
            role_id: 1,
            created_at: Utc::now(),
        }
    }

    fn credentials(password: &str) -> TokenRequest {
        TokenRequest {
            email: "ADA@example.com".to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn active_account_gets_a_token_for_its_id() {
        let user = account("analytical", true);
        let mut users = MockUserRepository::new();
        users
            .expect_get_by_email()
            .returning(move |email| {
                assert_eq!(email, "ada@example.com");
                Ok(Some(user.clone()))
            });

        let token = assert_ok!(
            service(users, MockMailer::new())
                .issue_token(credentials("analytical"))
                .await
        );
        let claims = assert_ok!(jwt().validate_token(&token));
        assert_eq!(claims.subject_id().unwrap(), 7);
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let active = account("analytical", true);
        let mut users = MockUserRepository::new();
        users
            .expect_get_by_email()
            .returning(move |_| Ok(Some(active.clone())));
        let err = assert_err!(
            service(users, MockMailer::new())
                .issue_token(credentials("difference"))
                .await
        );
        assert!(matches!(err, AuthError::Unauthorized));

        let inactive = account("analytical", false);
        let mut users = MockUserRepository::new();
        users
            .expect_get_by_email()
            .returning(move |_| Ok(Some(inactive.clone())));
        let err = assert_err!(
            service(users, MockMailer::new())
                .issue_token(credentials("analytical"))
                .await
        );
        assert!(matches!(err, AuthError::Unauthorized));

        let mut users = MockUserRepository::new();
        users.expect_get_by_email().returning(|_| Ok(None));
        let err = assert_err!(
            service(users, MockMailer::new())
                .issue_token(credentials("analytical"))
                .await
        );
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn activation_looks_up_the_token_digest() {
        let mut users = MockUserRepository::new();
        let expected = hash_token("plain-token");
        users
            .expect_activate()
            .returning(move |token_hash| {
                if token_hash == expected {
                    Ok(())
                } else {
                    Err(DatabaseError::NotFound)
                }
            });
        let accounts = service(users, MockMailer::new());

        assert_ok!(accounts.activate("plain-token").await);
        let err = assert_err!(accounts.activate("other-token").await);
        assert!(matches!(err, AuthError::NotFound(_)));
    }
}
