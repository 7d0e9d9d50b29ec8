//! Service settings loaded from `API_*` environment variables

use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

/// API service settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub addr: String,
    /// Deadline applied to every request's external calls
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Load settings, layering `API_ADDR` and `API_REQUEST_TIMEOUT_SECS` over defaults
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("addr", "0.0.0.0:3001")?
            .set_default("request_timeout_secs", 10_i64)?
            .add_source(
                config::Environment::with_prefix("API")
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
