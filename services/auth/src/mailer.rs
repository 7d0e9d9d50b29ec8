//! Invitation mail boundary
//!
//! Delivery itself is out of scope for this service; [`LogMailer`] records
//! what would have been sent.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Invitation mail settings
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Invitation lifetime in seconds (default: 3 days)
    pub invitation_expiry: u64,
}

impl MailConfig {
    /// Create a new MailConfig from environment variables
    ///
    /// # Environment Variables
    /// - `MAIL_INVITATION_EXPIRY`: Invitation lifetime in seconds (default: 259200)
    pub fn from_env() -> Result<Self> {
        let invitation_expiry = std::env::var("MAIL_INVITATION_EXPIRY")
            .unwrap_or_else(|_| "259200".to_string())
            .parse()
            .unwrap_or(259200);

        Ok(MailConfig { invitation_expiry })
    }
}

/// An invitation to activate a freshly registered account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub username: String,
    pub email: String,
    pub activation_url: String,
    /// Sandboxed mail is accepted but never delivered
    pub sandbox: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invitation(&self, invitation: &Invitation) -> Result<()>;
}

/// Mailer that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invitation(&self, invitation: &Invitation) -> Result<()> {
        info!(
            "Invitation for {} <{}> (sandbox: {}): {}",
            invitation.username, invitation.email, invitation.sandbox, invitation.activation_url
        );
        Ok(())
    }
}
