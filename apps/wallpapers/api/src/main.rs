use std::sync::Arc;
use std::time::Duration;

use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_wallpapers::{
    FeatureStore, HttpFeatureExtractor, HttpImageGenerator, QdrantFeatureStore,
};
use tracing::{info, warn};

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    if config.run_migrations {
        database::postgres::run_migrations::<migration::Migrator>(&db, &config.app.name)
            .await
            .map_err(|e| eyre::eyre!("Migrations failed: {}", e))?;
    }

    info!("Connecting to Qdrant at {}", config.qdrant.url);
    let features = QdrantFeatureStore::new(config.qdrant.clone())?;
    features.ensure_collection().await?;

    let extractor = HttpFeatureExtractor::new(config.extractor.clone())?;
    let generator = HttpImageGenerator::new(config.generator.clone())?;

    if config.admin_api_key.is_none() {
        warn!("ADMIN_API_KEY is not set, create and delete will be rejected");
    }

    let state = AppState {
        config,
        db,
        features: Arc::new(features),
        extractor: Arc::new(extractor),
        generator: Arc::new(generator),
    };

    let api_routes = api::routes(&state);

    let app = axum_helpers::create_router::<openapi::ApiDoc>(api_routes)
        .await?
        .merge(health_router(state.config.app.clone()))
        .merge(api::ready_router(state.clone()));

    let shutdown_timeout = Duration::from_secs(state.config.server.shutdown_timeout_secs);
    let server_config = state.config.server.clone();
    create_production_app(app, &server_config, shutdown_timeout, async move {
        info!("Closing database connections");
        if let Err(e) = state.db.close().await {
            warn!("Failed to close database connection: {}", e);
        }
    })
    .await?;

    info!("Server shutdown complete");
    Ok(())
}
