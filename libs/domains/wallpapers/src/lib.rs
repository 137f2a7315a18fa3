//! Wallpapers Domain
//!
//! Wallpaper catalog with tag/category filtering and visual similarity search.
//!
//! # Features
//!
//! - Filtered, paginated listing (tags are AND-matched, search covers category and tag names)
//! - Next/previous browsing under the same filters
//! - Similar wallpapers by cosine similarity of image feature vectors
//! - Create/delete kept consistent across Postgres and the vector store
//! - Client for the external AI image generator
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────────────────────┐
//! │ Service / Lifecycle (saga)  │  ← Queries, create/delete across stores
//! └──────┬───────────────┬──────┘
//!        │               │
//! ┌──────▼──────┐ ┌──────▼───────┐ ┌───────────────────┐
//! │ Repository  │ │ FeatureStore │ │ FeatureExtractor  │
//! │ (Postgres)  │ │  (Qdrant)    │ │ (HTTP)            │
//! └─────────────┘ └──────────────┘ └───────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum_helpers::ApiKey;
//! use domain_wallpapers::{
//!     handlers, FeatureExtractorConfig, HttpFeatureExtractor, InMemoryFeatureStore,
//!     InMemoryWallpaperRepository, WallpaperLifecycle, WallpaperService,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let repository = Arc::new(InMemoryWallpaperRepository::new());
//! let features = Arc::new(InMemoryFeatureStore::new());
//! let extractor = Arc::new(HttpFeatureExtractor::new(FeatureExtractorConfig::default())?);
//!
//! let service = WallpaperService::new(repository.clone(), repository.clone(), features.clone());
//! let lifecycle = WallpaperLifecycle::new(repository.clone(), repository, features, extractor);
//!
//! let router = handlers::router(service, lifecycle, ApiKey::new(Some("secret".into())));
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod features;
pub mod generation;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod saga;
pub mod service;
pub mod vector;

// Re-export commonly used types
pub use error::{WallpaperError, WallpaperResult};
pub use features::{FeatureExtractor, FeatureExtractorConfig, HttpFeatureExtractor};
pub use generation::{GeneratorConfig, HttpImageGenerator, ImageGenerator};
pub use lifecycle::WallpaperLifecycle;
pub use models::{
    AdjacentFilter, Category, CreateWallpaper, Direction, Tag, Wallpaper, WallpaperFilter,
    WallpaperPage,
};
pub use postgres::PgWallpaperRepository;
pub use repository::{CatalogRepository, InMemoryWallpaperRepository, WallpaperRepository};
pub use service::WallpaperService;
pub use vector::{FeatureStore, InMemoryFeatureStore, QdrantConfig, QdrantFeatureStore};
