//! Common library for the social backend
//!
//! This crate provides functionality shared by the authentication and API
//! services: PostgreSQL pooling and migrations, the Redis cache client, the
//! durable-store error taxonomy and the session token service.

pub mod cache;
pub mod database;
pub mod error;
pub mod jwt;

/// Example usage of the database module
///
/// ```rust,no_run
/// use common::database::{DatabaseConfig, init_pool, health_check};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env()?;
///     let pool = init_pool(&config).await?;
///     let is_healthy = health_check(&pool).await?;
///     println!("Database health check: {}", is_healthy);
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
