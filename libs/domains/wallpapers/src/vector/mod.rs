//! Feature vector storage for similarity search.
//!
//! One collection of fixed-size float vectors, compared with cosine
//! similarity. Wallpapers point at their vector through `feature_id`.

mod config;
mod memory;
mod qdrant;

pub use config::QdrantConfig;
pub use memory::InMemoryFeatureStore;
pub use qdrant::QdrantFeatureStore;

use async_trait::async_trait;
use database::common::{RetryConfig, retry_with_backoff_if};
use std::time::Duration;

use crate::error::{WallpaperError, WallpaperResult};

pub const COLLECTION_NAME: &str = "wallpaper_features";
pub const FEATURE_DIMENSION: usize = 1280;
/// Hits must score strictly above this cosine similarity
pub const SIMILARITY_THRESHOLD: f32 = 0.5;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Creates the collection and its index if absent. Idempotent.
    async fn ensure_collection(&self) -> WallpaperResult<()>;

    /// Stores a vector under a freshly assigned positive id
    async fn store(&self, features: Vec<f32>) -> WallpaperResult<i64>;

    /// Ids of the nearest vectors by descending score, `exclude_id` left out
    /// when positive, only scores above [`SIMILARITY_THRESHOLD`]
    async fn find_similar(
        &self,
        features: Vec<f32>,
        limit: usize,
        exclude_id: i64,
    ) -> WallpaperResult<Vec<i64>>;

    async fn delete(&self, feature_id: i64) -> WallpaperResult<()>;

    /// Single lookup. `FeatureNotFound` when the id is unknown.
    async fn get(&self, feature_id: i64) -> WallpaperResult<Vec<f32>>;

    async fn health_check(&self) -> WallpaperResult<()>;
}

pub fn check_dimension(features: &[f32]) -> WallpaperResult<()> {
    if features.len() != FEATURE_DIMENSION {
        return Err(WallpaperError::DimensionMismatch {
            expected: FEATURE_DIMENSION,
            actual: features.len(),
        });
    }
    Ok(())
}

/// Retry policy for [`fetch_features`]
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub attempts: u32,
    pub backoff: Duration,
    /// Bound on all attempts and sleeps together
    pub timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Reads a vector, retrying store failures per `policy`.
///
/// `FeatureNotFound` is returned at once. Running out of time surfaces as
/// `VectorStore`.
pub async fn fetch_features(
    store: &dyn FeatureStore,
    feature_id: i64,
    policy: &FetchPolicy,
) -> WallpaperResult<Vec<f32>> {
    let retry = RetryConfig::new()
        .with_max_retries(policy.attempts.saturating_sub(1))
        .with_initial_delay(policy.backoff.as_millis() as u64)
        .with_max_delay(policy.backoff.as_millis() as u64)
        .without_jitter();

    match tokio::time::timeout(
        policy.timeout,
        retry_with_backoff_if(
            || store.get(feature_id),
            retry,
            |e| !matches!(e, WallpaperError::FeatureNotFound(_)),
        ),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(feature_id, timeout = ?policy.timeout, "Feature lookup timed out");
            Err(WallpaperError::VectorStore(format!(
                "lookup of feature {} timed out after {:?}",
                feature_id, policy.timeout
            )))
        }
    }
}

/// Positive 63-bit id for a new point; the store has no auto-increment.
pub(crate) fn next_point_id() -> i64 {
    ((uuid::Uuid::new_v4().as_u128() as u64) >> 1).max(1) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_policy() -> FetchPolicy {
        FetchPolicy {
            attempts: 2,
            backoff: Duration::from_millis(5),
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_fetch_retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let mut store = MockFeatureStore::new();
        store.expect_get().times(2).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(WallpaperError::VectorStore("unavailable".into()))
            } else {
                Ok(vec![1.0; FEATURE_DIMENSION])
            }
        });

        let features = fetch_features(&store, 7, &quick_policy()).await.unwrap();
        assert_eq!(features.len(), FEATURE_DIMENSION);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_does_not_retry_missing_point() {
        let mut store = MockFeatureStore::new();
        store
            .expect_get()
            .times(1)
            .returning(|id| Err(WallpaperError::FeatureNotFound(id)));

        let policy = FetchPolicy {
            backoff: Duration::from_secs(5),
            ..quick_policy()
        };
        let started = std::time::Instant::now();
        let err = fetch_features(&store, 7, &policy).await.unwrap_err();

        assert!(matches!(err, WallpaperError::FeatureNotFound(7)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_fetch_gives_up_after_all_attempts() {
        let mut store = MockFeatureStore::new();
        store
            .expect_get()
            .times(2)
            .returning(|_| Err(WallpaperError::VectorStore("unavailable".into())));

        let err = fetch_features(&store, 7, &quick_policy()).await.unwrap_err();
        assert!(matches!(err, WallpaperError::VectorStore(_)));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let mut store = MockFeatureStore::new();
        store
            .expect_get()
            .returning(|_| Err(WallpaperError::VectorStore("slow".into())));

        let policy = FetchPolicy {
            attempts: 2,
            backoff: Duration::from_millis(200),
            timeout: Duration::from_millis(20),
        };
        let err = fetch_features(&store, 7, &policy).await.unwrap_err();
        assert!(matches!(err, WallpaperError::VectorStore(msg) if msg.contains("timed out")));
    }

    #[test]
    fn test_check_dimension() {
        assert!(check_dimension(&vec![0.0; FEATURE_DIMENSION]).is_ok());
        assert!(matches!(
            check_dimension(&[1.0, 2.0]),
            Err(WallpaperError::DimensionMismatch {
                expected: FEATURE_DIMENSION,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_point_ids_are_positive() {
        for _ in 0..100 {
            assert!(next_point_id() > 0);
        }
    }
}
