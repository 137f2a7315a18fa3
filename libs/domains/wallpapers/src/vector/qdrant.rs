use std::time::Duration;

use async_trait::async_trait;
use std::collections::HashMap;

use qdrant_client::qdrant::{
    self, Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    GetPointsBuilder, PointId, PointStruct, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder, value::Kind,
};
use qdrant_client::{Payload, Qdrant};

use super::{
    COLLECTION_NAME, FEATURE_DIMENSION, FeatureStore, QdrantConfig, SIMILARITY_THRESHOLD,
    check_dimension, next_point_id,
};
use crate::error::{WallpaperError, WallpaperResult};

/// Payload field holding the vector exactly as it was stored. Cosine
/// collections keep only the normalized copy in the vector itself.
const FEATURES_PAYLOAD_KEY: &str = "features";

/// Qdrant-backed implementation of FeatureStore
pub struct QdrantFeatureStore {
    client: Qdrant,
}

impl QdrantFeatureStore {
    pub fn new(config: QdrantConfig) -> WallpaperResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        let client = builder
            .build()
            .map_err(|e| WallpaperError::VectorStore(format!("Failed to build client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn point_id(feature_id: i64) -> PointId {
        PointId::from(feature_id as u64)
    }

    fn feature_id(point_id: &Option<PointId>) -> Option<i64> {
        match point_id.as_ref()?.point_id_options.as_ref()? {
            qdrant::point_id::PointIdOptions::Num(num) => Some(*num as i64),
            qdrant::point_id::PointIdOptions::Uuid(_) => None,
        }
    }

    /// Extract vector values from VectorsOutput
    /// Note: Uses deprecated data field for now until migration to 1.18+
    #[allow(deprecated)]
    fn extract_vector(vectors: &Option<qdrant::VectorsOutput>) -> Option<Vec<f32>> {
        match vectors {
            Some(qdrant::VectorsOutput {
                vectors_options: Some(opts),
            }) => match opts {
                qdrant::vectors_output::VectorsOptions::Vector(v) => Some(v.data.clone()),
                qdrant::vectors_output::VectorsOptions::Vectors(map) => {
                    map.vectors.values().next().map(|v| v.data.clone())
                }
            },
            _ => None,
        }
    }

    fn features_payload(features: &[f32]) -> Payload {
        let mut payload = Payload::new();
        payload.insert(FEATURES_PAYLOAD_KEY, features.to_vec());
        payload
    }

    /// Raw vector from the payload; `None` if the field is absent or malformed
    fn payload_features(payload: &HashMap<String, qdrant::Value>) -> Option<Vec<f32>> {
        match payload.get(FEATURES_PAYLOAD_KEY)?.kind.as_ref()? {
            Kind::ListValue(list) => list
                .values
                .iter()
                .map(|value| match value.kind {
                    Some(Kind::DoubleValue(v)) => Some(v as f32),
                    Some(Kind::IntegerValue(v)) => Some(v as f32),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    fn exclusion_filter(exclude_id: i64) -> Option<Filter> {
        (exclude_id > 0).then(|| {
            Filter::must_not([Condition::has_id([Self::point_id(exclude_id)])])
        })
    }

    /// score_threshold is inclusive; keep only strictly greater scores
    fn rank_hits(hits: Vec<ScoredPoint>, limit: usize, exclude_id: i64) -> Vec<i64> {
        hits.into_iter()
            .filter(|point| point.score > SIMILARITY_THRESHOLD)
            .filter_map(|point| Self::feature_id(&point.id))
            .filter(|id| *id != exclude_id)
            .take(limit)
            .collect()
    }
}

#[async_trait]
impl FeatureStore for QdrantFeatureStore {
    async fn ensure_collection(&self) -> WallpaperResult<()> {
        let collections = self.client.list_collections().await?;
        if collections
            .collections
            .iter()
            .any(|c| c.name == COLLECTION_NAME)
        {
            tracing::debug!(collection = COLLECTION_NAME, "Collection already exists");
            return Ok(());
        }

        let builder = CreateCollectionBuilder::new(COLLECTION_NAME).vectors_config(
            VectorParamsBuilder::new(FEATURE_DIMENSION as u64, Distance::Cosine),
        );
        self.client.create_collection(builder).await?;

        tracing::info!(
            collection = COLLECTION_NAME,
            dimension = FEATURE_DIMENSION,
            "Created feature collection"
        );
        Ok(())
    }

    async fn store(&self, features: Vec<f32>) -> WallpaperResult<i64> {
        check_dimension(&features)?;

        let feature_id = next_point_id();
        let payload = Self::features_payload(&features);
        let point = PointStruct::new(Self::point_id(feature_id), features, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(COLLECTION_NAME, vec![point]).wait(true))
            .await?;

        tracing::debug!(feature_id, "Stored feature vector");
        Ok(feature_id)
    }

    async fn find_similar(
        &self,
        features: Vec<f32>,
        limit: usize,
        exclude_id: i64,
    ) -> WallpaperResult<Vec<i64>> {
        check_dimension(&features)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut builder = SearchPointsBuilder::new(COLLECTION_NAME, features, limit as u64)
            .score_threshold(SIMILARITY_THRESHOLD)
            .with_payload(false)
            .with_vectors(false);

        if let Some(filter) = Self::exclusion_filter(exclude_id) {
            builder = builder.filter(filter);
        }

        let results = self.client.search_points(builder).await?;
        Ok(Self::rank_hits(results.result, limit, exclude_id))
    }

    async fn delete(&self, feature_id: i64) -> WallpaperResult<()> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(COLLECTION_NAME)
                    .points(vec![Self::point_id(feature_id)])
                    .wait(true),
            )
            .await?;

        tracing::debug!(feature_id, "Deleted feature vector");
        Ok(())
    }

    async fn get(&self, feature_id: i64) -> WallpaperResult<Vec<f32>> {
        let builder = GetPointsBuilder::new(COLLECTION_NAME, vec![Self::point_id(feature_id)])
            .with_vectors(true)
            .with_payload(true);

        let results = self.client.get_points(builder).await?;

        // points written without the payload copy fall back to the stored vector
        results
            .result
            .first()
            .and_then(|point| {
                Self::payload_features(&point.payload)
                    .or_else(|| Self::extract_vector(&point.vectors))
            })
            .ok_or(WallpaperError::FeatureNotFound(feature_id))
    }

    async fn health_check(&self) -> WallpaperResult<()> {
        self.client.health_check().await?;
        Ok(())
    }
}
