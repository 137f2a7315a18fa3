//! Relational connectivity shared by the wallpaper services.
//!
//! - `common`: error type and retry/backoff helpers (usable for any remote call)
//! - `postgres` (default feature): SeaORM connection pool, migrations, health check
//! - `config` feature: `core_config::FromEnv` for [`postgres::PostgresConfig`]
//!
//! ```ignore
//! use database::postgres;
//! use migration::Migrator;
//!
//! let config = postgres::PostgresConfig::from_env()?;
//! let db = postgres::connect_from_config_with_retry(config, None).await?;
//! postgres::run_migrations::<Migrator>(&db, "wallpaper_api").await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult};
