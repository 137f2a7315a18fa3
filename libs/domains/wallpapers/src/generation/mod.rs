//! Contract with the external image generation service.
//!
//! Generation runs remotely as a task: `generate` either answers at once or
//! returns a `task_id` whose progress is read through `status`.

mod client;
pub mod handlers;

pub use client::HttpImageGenerator;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional, env_parse};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{WallpaperError, WallpaperResult};
use crate::features::DEFAULT_EXTRACTOR_URL;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_EXTRACTOR_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl FromEnv for GeneratorConfig {
    /// Falls back to the feature extractor's URL; both endpoints are usually
    /// served by the same process.
    fn from_env() -> Result<Self, ConfigError> {
        let url = env_optional("IMAGE_GENERATOR_URL")
            .or_else(|| env_optional("FEATURE_EXTRACTOR_URL"))
            .unwrap_or_else(|| DEFAULT_EXTRACTOR_URL.to_string());

        Ok(Self {
            url,
            timeout_secs: env_parse("IMAGE_GENERATOR_TIMEOUT_SECS", "120")?,
        })
    }
}

/// Body sent to `POST /api/images/generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GenerateRequest {
    pub prompt: String,
    pub n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub cfg_scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GenerateResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default)]
    pub saved_path_url: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateResponse {
    pub fn is_finished(&self) -> bool {
        self.status == STATUS_COMPLETED || self.status == STATUS_FAILED
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeneratorsResponse {
    pub generators: Vec<String>,
}

/// Client request for `POST /api/images/generate`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GenerateImage {
    #[validate(length(min = 1))]
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[validate(range(min = 64, max = 4096))]
    pub width: u32,
    #[validate(range(min = 64, max = 4096))]
    pub height: u32,
    /// Must name an existing category
    pub category: String,
    #[serde(default)]
    pub generator_type: Option<String>,
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default = "default_cfg_scale")]
    pub cfg_scale: f64,
}

fn default_steps() -> u32 {
    30
}

fn default_cfg_scale() -> f64 {
    7.0
}

impl From<GenerateImage> for GenerateRequest {
    fn from(input: GenerateImage) -> Self {
        Self {
            prompt: input.prompt,
            n: 1,
            negative_prompt: input.negative_prompt,
            width: input.width,
            height: input.height,
            steps: input.steps,
            cfg_scale: input.cfg_scale,
            generator_type: input.generator_type,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> WallpaperResult<GenerateResponse>;

    async fn status(&self, task_id: &str) -> WallpaperResult<GenerateResponse>;

    async fn generators(&self) -> WallpaperResult<GeneratorsResponse>;
}

/// Task ids are opaque tokens from the generator; anything else would change
/// the path of the status request.
pub fn check_task_id(task_id: &str) -> WallpaperResult<()> {
    let valid = !task_id.is_empty()
        && task_id.len() <= 128
        && task_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(WallpaperError::Validation(format!("Invalid task id: {}", task_id)))
    }
}

/// Polls `status` every `interval` until the task completes or fails.
pub async fn poll_until_finished(
    generator: &dyn ImageGenerator,
    task_id: &str,
    interval: Duration,
    max_wait: Duration,
) -> WallpaperResult<GenerateResponse> {
    let poll = async {
        loop {
            let response = generator.status(task_id).await?;
            if response.is_finished() {
                return Ok(response);
            }
            tracing::debug!(task_id, status = %response.status, "Generation still running");
            tokio::time::sleep(interval).await;
        }
    };

    tokio::time::timeout(max_wait, poll).await.map_err(|_| {
        WallpaperError::Generator(format!(
            "task {} did not finish within {:?}",
            task_id, max_wait
        ))
    })?
}
