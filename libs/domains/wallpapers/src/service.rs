use std::sync::Arc;

use tracing::warn;

use crate::error::{WallpaperError, WallpaperResult};
use crate::models::{AdjacentFilter, Category, Direction, Wallpaper, WallpaperFilter, WallpaperPage};
use crate::repository::{CatalogRepository, WallpaperRepository, order_by_feature_ids};
use crate::vector::{FeatureStore, FetchPolicy, fetch_features};

/// Read side of the catalog: filtered listing, browsing and similarity
#[derive(Clone)]
pub struct WallpaperService {
    wallpapers: Arc<dyn WallpaperRepository>,
    catalog: Arc<dyn CatalogRepository>,
    features: Arc<dyn FeatureStore>,
    fetch_policy: FetchPolicy,
    images_base_url: Option<String>,
}

impl WallpaperService {
    pub fn new(
        wallpapers: Arc<dyn WallpaperRepository>,
        catalog: Arc<dyn CatalogRepository>,
        features: Arc<dyn FeatureStore>,
    ) -> Self {
        Self {
            wallpapers,
            catalog,
            features,
            fetch_policy: FetchPolicy::default(),
            images_base_url: None,
        }
    }

    /// Prefix for relative category image paths
    pub fn with_images_base_url(mut self, base_url: Option<String>) -> Self {
        self.images_base_url = base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self
    }

    pub fn with_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    pub async fn list(&self, filter: WallpaperFilter) -> WallpaperResult<WallpaperPage> {
        self.wallpapers.list(&filter).await
    }

    pub async fn get(&self, id: i32) -> WallpaperResult<Wallpaper> {
        self.wallpapers
            .get_by_id(id)
            .await?
            .ok_or_else(|| WallpaperError::wallpaper_not_found(id))
    }

    pub async fn adjacent(
        &self,
        filter: AdjacentFilter,
        direction: Direction,
    ) -> WallpaperResult<Wallpaper> {
        let label = match direction {
            Direction::Next => "next",
            Direction::Previous => "previous",
        };
        self.wallpapers
            .find_adjacent(&filter, direction)
            .await?
            .ok_or_else(|| WallpaperError::NotFound(format!("No {} wallpaper", label)))
    }

    /// Wallpapers whose feature vectors are closest to this one's, in ranking
    /// order. Empty when the wallpaper has no stored vector.
    pub async fn similar(&self, id: i32, limit: usize) -> WallpaperResult<Vec<Wallpaper>> {
        let wallpaper = self.get(id).await?;
        let feature_id = wallpaper.feature_id;
        if feature_id == 0 {
            return Ok(Vec::new());
        }

        let features = match fetch_features(&*self.features, feature_id, &self.fetch_policy).await
        {
            Ok(features) => features,
            Err(WallpaperError::FeatureNotFound(_)) => {
                warn!(wallpaper_id = id, feature_id, "Feature vector missing for wallpaper");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let feature_ids = self
            .features
            .find_similar(features, limit, feature_id)
            .await?;
        if feature_ids.is_empty() {
            return Ok(Vec::new());
        }

        let owners = self.wallpapers.find_by_feature_ids(&feature_ids).await?;
        Ok(order_by_feature_ids(&feature_ids, owners))
    }

    pub async fn list_categories(&self) -> WallpaperResult<Vec<Category>> {
        let mut categories = self.catalog.list_categories().await?;
        if let Some(base) = &self.images_base_url {
            for category in &mut categories {
                if let Some(url) = category.image_url.as_mut() {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        *url = format!("{}/{}", base, url.trim_start_matches('/'));
                    }
                }
            }
        }
        Ok(categories)
    }

    /// Looks up a category by exact name
    pub async fn find_category(&self, name: &str) -> WallpaperResult<Option<Category>> {
        self.catalog.find_category(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewWallpaper;
    use crate::repository::{InMemoryWallpaperRepository, MockCatalogRepository};
    use crate::vector::{FEATURE_DIMENSION, InMemoryFeatureStore, MockFeatureStore};
    use chrono::Utc;
    use std::time::Duration;

    fn vector(axis: usize, spill: f32) -> Vec<f32> {
        let mut v = vec![0.0; FEATURE_DIMENSION];
        v[axis] = 1.0;
        v[axis + 1] = spill;
        v
    }

    async fn insert(repo: &InMemoryWallpaperRepository, feature_id: i64) -> Wallpaper {
        let category = repo.get_or_create_category("nature").await.unwrap();
        repo.insert(NewWallpaper {
            title: format!("w{}", feature_id),
            description: String::new(),
            image_url: "/images/w.jpg".into(),
            thumbnail_url: String::new(),
            medium_url: None,
            category_id: category.id,
            feature_id,
            tag_ids: vec![],
        })
        .await
        .unwrap()
    }

    fn service(repo: &InMemoryWallpaperRepository, store: Arc<dyn FeatureStore>) -> WallpaperService {
        WallpaperService::new(Arc::new(repo.clone()), Arc::new(repo.clone()), store).with_fetch_policy(
            FetchPolicy {
                attempts: 2,
                backoff: Duration::from_millis(1),
                timeout: Duration::from_secs(1),
            },
        )
    }

    #[tokio::test]
    async fn test_similar_follows_ranking_and_skips_orphans() {
        let repo = InMemoryWallpaperRepository::new();
        let store = InMemoryFeatureStore::new();

        let query_id = store.store(vector(0, 0.0)).await.unwrap();
        let far_id = store.store(vector(0, 0.9)).await.unwrap();
        let near_id = store.store(vector(0, 0.1)).await.unwrap();
        // closest of all, but no wallpaper owns it
        store.store(vector(0, 0.05)).await.unwrap();

        let query = insert(&repo, query_id).await;
        let far = insert(&repo, far_id).await;
        let near = insert(&repo, near_id).await;

        let service = service(&repo, Arc::new(store));
        let similar = service.similar(query.id, 10).await.unwrap();

        let ids: Vec<i32> = similar.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![near.id, far.id]);
    }

    #[tokio::test]
    async fn test_similar_without_features_is_empty() {
        let repo = InMemoryWallpaperRepository::new();
        let wallpaper = insert(&repo, 0).await;

        let service = service(&repo, Arc::new(MockFeatureStore::new()));
        assert!(service.similar(wallpaper.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_similar_with_missing_vector_is_empty() {
        let repo = InMemoryWallpaperRepository::new();
        let wallpaper = insert(&repo, 5).await;

        let service = service(&repo, Arc::new(InMemoryFeatureStore::new()));
        assert!(service.similar(wallpaper.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_similar_surfaces_store_outage() {
        let repo = InMemoryWallpaperRepository::new();
        let wallpaper = insert(&repo, 5).await;

        let mut store = MockFeatureStore::new();
        store
            .expect_get()
            .returning(|_| Err(WallpaperError::VectorStore("down".into())));

        let service = service(&repo, Arc::new(store));
        assert!(matches!(
            service.similar(wallpaper.id, 10).await,
            Err(WallpaperError::VectorStore(_))
        ));
    }

    #[tokio::test]
    async fn test_similar_unknown_wallpaper_is_not_found() {
        let repo = InMemoryWallpaperRepository::new();
        let service = service(&repo, Arc::new(InMemoryFeatureStore::new()));
        assert!(matches!(
            service.similar(1, 10).await,
            Err(WallpaperError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_adjacent_by_id() {
        let repo = InMemoryWallpaperRepository::new();
        let first = insert(&repo, 0).await;
        let second = insert(&repo, 0).await;
        let third = insert(&repo, 0).await;
        let service = service(&repo, Arc::new(InMemoryFeatureStore::new()));

        let filter = |id| AdjacentFilter {
            current_id: id,
            category: None,
            search: None,
        };

        let next = service.adjacent(filter(second.id), Direction::Next).await.unwrap();
        assert_eq!(next.id, first.id);
        let previous = service
            .adjacent(filter(second.id), Direction::Previous)
            .await
            .unwrap();
        assert_eq!(previous.id, third.id);

        assert!(matches!(
            service.adjacent(filter(first.id), Direction::Next).await,
            Err(WallpaperError::NotFound(_))
        ));
        assert!(matches!(
            service.adjacent(filter(third.id), Direction::Previous).await,
            Err(WallpaperError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_category_images_get_base_url() {
        let now = Utc::now();
        let mut catalog = MockCatalogRepository::new();
        catalog.expect_list_categories().returning(move || {
            Ok(vec![
                Category {
                    id: 1,
                    name: "abstract".into(),
                    image_url: Some("/categories/abstract.jpg".into()),
                    created_at: now,
                    updated_at: now,
                },
                Category {
                    id: 2,
                    name: "nature".into(),
                    image_url: Some("https://cdn.example.com/nature.jpg".into()),
                    created_at: now,
                    updated_at: now,
                },
                Category {
                    id: 3,
                    name: "space".into(),
                    image_url: None,
                    created_at: now,
                    updated_at: now,
                },
            ])
        });

        let service = WallpaperService::new(
            Arc::new(InMemoryWallpaperRepository::new()),
            Arc::new(catalog),
            Arc::new(InMemoryFeatureStore::new()),
        )
        .with_images_base_url(Some("https://images.example.com/".into()));

        let categories = service.list_categories().await.unwrap();
        assert_eq!(
            categories[0].image_url.as_deref(),
            Some("https://images.example.com/categories/abstract.jpg")
        );
        assert_eq!(
            categories[1].image_url.as_deref(),
            Some("https://cdn.example.com/nature.jpg")
        );
        assert_eq!(categories[2].image_url, None);
    }
}
