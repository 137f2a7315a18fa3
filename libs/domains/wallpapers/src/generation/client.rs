use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::{
    GenerateRequest, GenerateResponse, GeneratorConfig, GeneratorsResponse, ImageGenerator,
    check_task_id,
};
use crate::error::{WallpaperError, WallpaperResult};

/// HTTP implementation of ImageGenerator
pub struct HttpImageGenerator {
    base_url: Url,
    client: Client,
}

impl HttpImageGenerator {
    pub fn new(config: GeneratorConfig) -> WallpaperResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WallpaperError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                WallpaperError::Internal(format!("Invalid image generator URL: {}", config.url))
            })?;

        Ok(Self { base_url, client })
    }

    /// `{base}/api/images/{segments..}`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "images"]).extend(segments);
        }
        url
    }

    async fn decode<T: DeserializeOwned>(response: Response, operation: &str) -> WallpaperResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(operation, status = %status, error = %body, "Image generator request failed");
            return Err(WallpaperError::Generator(format!(
                "{} returned {}: {}",
                operation, status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| WallpaperError::Generator(format!("invalid {} response: {}", operation, e)))
    }
}

fn send_error(e: reqwest::Error) -> WallpaperError {
    WallpaperError::Generator(format!("request failed: {}", e))
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate(&self, request: GenerateRequest) -> WallpaperResult<GenerateResponse> {
        debug!(prompt = %request.prompt, generator = ?request.generator_type, "Requesting image generation");

        let response = self
            .client
            .post(self.endpoint(&["generate"]))
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;

        Self::decode(response, "generate").await
    }

    async fn status(&self, task_id: &str) -> WallpaperResult<GenerateResponse> {
        check_task_id(task_id)?;

        let response = self
            .client
            .get(self.endpoint(&["status", task_id]))
            .send()
            .await
            .map_err(send_error)?;

        Self::decode(response, "status").await
    }

    async fn generators(&self) -> WallpaperResult<GeneratorsResponse> {
        let response = self
            .client
            .get(self.endpoint(&["generators"]))
            .send()
            .await
            .map_err(send_error)?;

        Self::decode(response, "generators").await
    }
}
