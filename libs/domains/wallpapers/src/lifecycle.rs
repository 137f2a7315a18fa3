//! Create and delete, kept consistent across the relational and vector stores.

use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, instrument};

use crate::error::{WallpaperError, WallpaperResult};
use crate::features::FeatureExtractor;
use crate::models::{CreateWallpaper, NewWallpaper, Wallpaper};
use crate::repository::{CatalogRepository, WallpaperRepository};
use crate::saga::Saga;
use crate::vector::FeatureStore;

#[derive(Clone)]
pub struct WallpaperLifecycle {
    wallpapers: Arc<dyn WallpaperRepository>,
    catalog: Arc<dyn CatalogRepository>,
    features: Arc<dyn FeatureStore>,
    extractor: Arc<dyn FeatureExtractor>,
}

impl WallpaperLifecycle {
    pub fn new(
        wallpapers: Arc<dyn WallpaperRepository>,
        catalog: Arc<dyn CatalogRepository>,
        features: Arc<dyn FeatureStore>,
        extractor: Arc<dyn FeatureExtractor>,
    ) -> Self {
        Self {
            wallpapers,
            catalog,
            features,
            extractor,
        }
    }

    /// Resolves category and tags, stores the image's feature vector, then
    /// inserts the row. A failed insert deletes the stored vector again.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(&self, input: CreateWallpaper) -> WallpaperResult<Wallpaper> {
        input.check().map_err(WallpaperError::Validation)?;

        let category = self
            .catalog
            .get_or_create_category(input.category.trim())
            .await?;
        let tags = self.catalog.get_or_create_tags(&input.tags).await?;

        let features = self.extractor.extract(&input.image_url).await?;
        let feature_id = self.features.store(features).await?;

        let mut saga = Saga::new();
        let store = self.features.clone();
        saga.add_compensation("delete_features", move || {
            async move { store.delete(feature_id).await }.boxed()
        });

        let result = self
            .wallpapers
            .insert(NewWallpaper {
                title: input.title.trim().to_string(),
                description: input.description,
                image_url: input.image_url,
                thumbnail_url: input.thumbnail_url,
                medium_url: input.medium_url,
                category_id: category.id,
                feature_id,
                tag_ids: tags.iter().map(|t| t.id).collect(),
            })
            .await;

        match result {
            Ok(wallpaper) => {
                saga.commit();
                info!(wallpaper_id = wallpaper.id, feature_id, "Wallpaper created");
                Ok(wallpaper)
            }
            Err(e) => {
                error!(feature_id, error = %e, "Wallpaper insert failed, removing stored features");
                saga.rollback().await;
                Err(e)
            }
        }
    }

    /// Deletes the row and its feature vector. If the vector cannot be removed
    /// the row is kept and `CrossStoreInconsistency` is returned.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> WallpaperResult<()> {
        let pending = self.wallpapers.begin_delete(id).await?;
        let feature_id = pending.wallpaper().feature_id;

        if feature_id != 0 {
            if let Err(e) = self.features.delete(feature_id).await {
                error!(wallpaper_id = id, feature_id, error = %e, "Feature delete failed, keeping wallpaper");
                if let Err(rollback_err) = pending.rollback().await {
                    error!(wallpaper_id = id, error = %rollback_err, "Rollback failed");
                }
                return Err(WallpaperError::CrossStoreInconsistency(format!(
                    "could not delete feature {} of wallpaper {}: {}",
                    feature_id, id, e
                )));
            }
        }

        if let Err(e) = pending.commit().await {
            if feature_id == 0 {
                return Err(e);
            }
            error!(
                wallpaper_id = id,
                feature_id,
                error = %e,
                "Commit failed after feature vector was deleted"
            );
            return Err(WallpaperError::CrossStoreInconsistency(format!(
                "wallpaper {} kept but feature {} deleted: {}",
                id, feature_id, e
            )));
        }

        info!(wallpaper_id = id, feature_id, "Wallpaper deleted");
        Ok(())
    }
}
