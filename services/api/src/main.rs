use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod authorization;
mod cache;
mod context;
mod error;
mod feed;
mod middleware;
mod models;
mod posts;
mod repositories;
mod resolver;
mod routes;
mod settings;
mod state;
mod users;

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
    jwt::{JwtConfig, JwtService},
};
use tokio::net::TcpListener;

use crate::{
    authorization::Authorizer,
    cache::{DisabledUserCache, RedisUserCache, UserCache},
    posts::PostService,
    repositories::Storage,
    resolver::UserResolver,
    settings::ServerConfig,
    state::AppState,
    users::UserService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting API service");

    let server_config = ServerConfig::from_env()?;

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

    let redis_config = RedisConfig::from_env()?;
    let user_cache: Arc<dyn UserCache> = if redis_config.enabled {
        Arc::new(RedisUserCache::new(RedisPool::new(&redis_config).await?))
    } else {
        warn!("Redis cache disabled, user lookups go straight to the database");
        Arc::new(DisabledUserCache)
    };

    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;

    let storage = Storage::postgres(pool.clone());
    let resolver = UserResolver::new(storage.users.clone(), user_cache);
    let authorizer = Authorizer::new(storage.roles.clone());

    let app_state = AppState {
        db_pool: pool,
        jwt_service,
        resolver: resolver.clone(),
        posts: PostService::new(storage.clone(), authorizer),
        users: UserService::new(storage, resolver),
        request_timeout: server_config.request_timeout(),
    };

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&server_config.addr).await?;
    info!("API service listening on {}", server_config.addr);

    axum::serve(listener, app).await?;

    Ok(())
}
