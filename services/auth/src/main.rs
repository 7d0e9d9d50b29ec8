use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod accounts;
mod error;
mod mailer;
mod models;
mod password;
mod repositories;
mod routes;
mod settings;
mod validation;

use common::{
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
    jwt::{JwtConfig, JwtService},
};
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::{
    accounts::AccountService,
    mailer::{LogMailer, MailConfig},
    repositories::PgUserRepository,
    settings::AuthConfig,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub accounts: AccountService,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting authentication service");

    let auth_config = AuthConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    // Initialize JWT service
    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;

    let accounts = AccountService::new(
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(LogMailer),
        jwt_service,
        MailConfig::from_env()?,
        auth_config.frontend_url.clone(),
        !auth_config.is_production(),
    );

    let app_state = AppState {
        db_pool: pool,
        accounts,
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&auth_config.addr).await?;
    info!("Authentication service listening on {}", auth_config.addr);

    axum::serve(listener, app).await?;

    Ok(())
}
