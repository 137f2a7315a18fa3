use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{FeatureStore, SIMILARITY_THRESHOLD, check_dimension, next_point_id};
use crate::error::{WallpaperError, WallpaperResult};

/// In-memory implementation of FeatureStore (for testing/development).
/// Brute-force cosine search over every stored vector.
#[derive(Clone, Default)]
pub struct InMemoryFeatureStore {
    points: Arc<RwLock<HashMap<i64, Vec<f32>>>>,
}

impl InMemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }

    pub async fn contains(&self, feature_id: i64) -> bool {
        self.points.read().await.contains_key(&feature_id)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl FeatureStore for InMemoryFeatureStore {
    async fn ensure_collection(&self) -> WallpaperResult<()> {
        Ok(())
    }

    async fn store(&self, features: Vec<f32>) -> WallpaperResult<i64> {
        check_dimension(&features)?;

        let mut points = self.points.write().await;
        let mut feature_id = next_point_id();
        while points.contains_key(&feature_id) {
            feature_id = next_point_id();
        }
        points.insert(feature_id, features);
        Ok(feature_id)
    }

    async fn find_similar(
        &self,
        features: Vec<f32>,
        limit: usize,
        exclude_id: i64,
    ) -> WallpaperResult<Vec<i64>> {
        check_dimension(&features)?;

        let points = self.points.read().await;
        let mut scored: Vec<(i64, f32)> = points
            .iter()
            .filter(|(id, _)| exclude_id <= 0 || **id != exclude_id)
            .map(|(id, values)| (*id, cosine_similarity(&features, values)))
            .filter(|(_, score)| *score > SIMILARITY_THRESHOLD)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(scored.into_iter().take(limit).map(|(id, _)| id).collect())
    }

    async fn delete(&self, feature_id: i64) -> WallpaperResult<()> {
        self.points.write().await.remove(&feature_id);
        Ok(())
    }

    async fn get(&self, feature_id: i64) -> WallpaperResult<Vec<f32>> {
        self.points
            .read()
            .await
            .get(&feature_id)
            .cloned()
            .ok_or(WallpaperError::FeatureNotFound(feature_id))
    }

    async fn health_check(&self) -> WallpaperResult<()> {
        Ok(())
    }
}
