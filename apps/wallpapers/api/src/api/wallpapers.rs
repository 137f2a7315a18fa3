use std::sync::Arc;

use axum::Router;
use axum_helpers::ApiKey;
use domain_wallpapers::{PgWallpaperRepository, WallpaperLifecycle, WallpaperService, handlers};

/// Read service over PostgreSQL and the vector store
pub fn service(state: &crate::state::AppState) -> WallpaperService {
    let repository = Arc::new(PgWallpaperRepository::new(state.db.clone()));
    WallpaperService::new(repository.clone(), repository, state.features.clone())
        .with_images_base_url(state.config.images_base_url.clone())
}

pub fn router(state: &crate::state::AppState) -> Router {
    let repository = Arc::new(PgWallpaperRepository::new(state.db.clone()));
    let lifecycle = WallpaperLifecycle::new(
        repository.clone(),
        repository,
        state.features.clone(),
        state.extractor.clone(),
    );
    let api_key = ApiKey::new(state.config.admin_api_key.clone());

    handlers::router(service(state), lifecycle, api_key)
}
