//! Client for the image feature extraction service.

use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{WallpaperError, WallpaperResult};

pub const DEFAULT_EXTRACTOR_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureExtractorConfig {
    /// Base URL, without the `/api/...` path
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for FeatureExtractorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_EXTRACTOR_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl FromEnv for FeatureExtractorConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_or_default("FEATURE_EXTRACTOR_URL", DEFAULT_EXTRACTOR_URL),
            timeout_secs: env_parse("FEATURE_EXTRACTOR_TIMEOUT_SECS", "60")?,
        })
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// Computes the feature vector of the image at `image_path`
    async fn extract(&self, image_path: &str) -> WallpaperResult<Vec<f32>>;
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    image_path: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    features: Vec<f32>,
}

/// HTTP implementation of FeatureExtractor
pub struct HttpFeatureExtractor {
    base_url: String,
    client: Client,
}

impl HttpFeatureExtractor {
    pub fn new(config: FeatureExtractorConfig) -> WallpaperResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WallpaperError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl FeatureExtractor for HttpFeatureExtractor {
    async fn extract(&self, image_path: &str) -> WallpaperResult<Vec<f32>> {
        debug!(image_path, "Requesting feature extraction");

        let response = self
            .client
            .post(format!("{}/api/images/extract-features", self.base_url))
            .json(&ExtractRequest { image_path })
            .send()
            .await
            .map_err(|e| WallpaperError::Extraction(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(image_path, status = %status, error = %body, "Feature extraction failed");
            return Err(WallpaperError::Extraction(format!(
                "extractor returned {}: {}",
                status, body
            )));
        }

        let body: ExtractResponse = response
            .json()
            .await
            .map_err(|e| WallpaperError::Extraction(format!("invalid response body: {}", e)))?;

        debug!(image_path, dimension = body.features.len(), "Extracted features");
        Ok(body.features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn extractor(url: String) -> HttpFeatureExtractor {
        HttpFeatureExtractor::new(FeatureExtractorConfig {
            url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_extract_posts_image_path() {
        let router = Router::new().route(
            "/api/images/extract-features",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["image_path"], "/images/aurora.jpg");
                Json(json!({ "features": [0.25, 0.5, 1.0] }))
            }),
        );
        let url = spawn(router).await;

        let features = extractor(format!("{}/", url))
            .extract("/images/aurora.jpg")
            .await
            .unwrap();
        assert_eq!(features, vec![0.25, 0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_non_success_status_is_extraction_error() {
        let router = Router::new().route(
            "/api/images/extract-features",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model not loaded") }),
        );
        let url = spawn(router).await;

        let err = extractor(url).extract("/images/a.jpg").await.unwrap_err();
        assert!(matches!(err, WallpaperError::Extraction(msg) if msg.contains("model not loaded")));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_extraction_error() {
        let router = Router::new().route(
            "/api/images/extract-features",
            post(|| async { Json(json!({ "vector": [1.0] })) }),
        );
        let url = spawn(router).await;

        let err = extractor(url).extract("/images/a.jpg").await.unwrap_err();
        assert!(matches!(err, WallpaperError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_extraction_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = extractor(format!("http://{}", addr))
            .extract("/images/a.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, WallpaperError::Extraction(_)));
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("FEATURE_EXTRACTOR_URL", Some("http://extractor:9000")),
                ("FEATURE_EXTRACTOR_TIMEOUT_SECS", None),
            ],
            || {
                let config = FeatureExtractorConfig::from_env().unwrap();
                assert_eq!(config.url, "http://extractor:9000");
                assert_eq!(config.timeout_secs, 60);
            },
        );
    }
}
