//! Shared application state passed to the route builders and the readiness check.

use std::sync::Arc;

use domain_wallpapers::{FeatureExtractor, FeatureStore, ImageGenerator};

/// Cloned per router; every field is a pool or an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    /// PostgreSQL connection pool
    pub db: database::postgres::DatabaseConnection,
    /// Vector store holding one feature vector per wallpaper
    pub features: Arc<dyn FeatureStore>,
    pub extractor: Arc<dyn FeatureExtractor>,
    pub generator: Arc<dyn ImageGenerator>,
}
