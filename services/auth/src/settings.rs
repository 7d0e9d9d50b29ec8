//! Service settings loaded from `AUTH_*` environment variables

use anyhow::Result;
use serde::Deserialize;

/// Authentication service settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Listen address
    pub addr: String,
    /// Base URL of the frontend; activation links point below it
    pub frontend_url: String,
    /// Deployment environment name
    pub env: String,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("addr", "0.0.0.0:3000")?
            .set_default("frontend_url", "http://localhost:5173")?
            .set_default("env", "development")?
            .add_source(config::Environment::with_prefix("AUTH").prefix_separator("_"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Mail is only really delivered in production
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }
}
