use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_helpers::{
    ValidatedJson,
    errors::responses::{
        BadRequestValidationResponse, InternalServerErrorResponse, ServiceUnavailableResponse,
    },
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use super::{
    GenerateImage, GenerateRequest, GenerateResponse, GeneratorsResponse, ImageGenerator,
    STATUS_PENDING, check_task_id,
};
use crate::error::{WallpaperError, WallpaperResult};
use crate::service::WallpaperService;

pub const IMAGES_TAG: &str = "images";

/// OpenAPI documentation for the image generation API
#[derive(OpenApi)]
#[openapi(
    paths(generate_image, generation_status, list_generators),
    components(
        schemas(GenerateImage, GenerateResponse, GeneratorsResponse, GenerationOutcome, PendingGeneration),
        responses(BadRequestValidationResponse, ServiceUnavailableResponse, InternalServerErrorResponse)
    ),
    tags((name = IMAGES_TAG, description = "AI wallpaper generation"))
)]
pub struct ApiDoc;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PendingGeneration {
    pub status: String,
    pub task_id: String,
}

/// Either a queued task or an immediate result
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum GenerationOutcome {
    Pending(PendingGeneration),
    Finished(GenerateResponse),
}

struct ImagesState {
    generator: Arc<dyn ImageGenerator>,
    wallpapers: WallpaperService,
}

/// Create the image generation router
pub fn router(generator: Arc<dyn ImageGenerator>, wallpapers: WallpaperService) -> Router {
    Router::new()
        .route("/generate", post(generate_image))
        .route("/status/{task_id}", get(generation_status))
        .route("/generators", get(list_generators))
        .with_state(Arc::new(ImagesState {
            generator,
            wallpapers,
        }))
}

/// Start generating an image for an existing category
#[utoipa::path(
    post,
    path = "/generate",
    tag = IMAGES_TAG,
    request_body = GenerateImage,
    responses(
        (status = 200, description = "Task queued or image ready", body = GenerationOutcome),
        (status = 400, response = BadRequestValidationResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn generate_image(
    State(state): State<Arc<ImagesState>>,
    ValidatedJson(input): ValidatedJson<GenerateImage>,
) -> WallpaperResult<Json<GenerationOutcome>> {
    if state
        .wallpapers
        .find_category(input.category.trim())
        .await?
        .is_none()
    {
        return Err(WallpaperError::Validation("Category not found".to_string()));
    }

    let response = state.generator.generate(GenerateRequest::from(input)).await?;

    if let Some(task_id) = response.task_id {
        tracing::info!(task_id = %task_id, "Image generation queued");
        return Ok(Json(GenerationOutcome::Pending(PendingGeneration {
            status: STATUS_PENDING.to_string(),
            task_id,
        })));
    }

    if response.saved_path_url.is_empty() {
        return Err(WallpaperError::Generator(
            "No task ID or saved path received".to_string(),
        ));
    }

    Ok(Json(GenerationOutcome::Finished(response)))
}

/// Status of a generation task
#[utoipa::path(
    get,
    path = "/status/{task_id}",
    tag = IMAGES_TAG,
    params(("task_id" = String, Path, description = "Generation task ID")),
    responses(
        (status = 200, description = "Current task status", body = GenerateResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 503, response = ServiceUnavailableResponse)
    )
)]
async fn generation_status(
    State(state): State<Arc<ImagesState>>,
    Path(task_id): Path<String>,
) -> WallpaperResult<Json<GenerateResponse>> {
    check_task_id(&task_id)?;
    Ok(Json(state.generator.status(&task_id).await?))
}

/// Generators offered by the image service
#[utoipa::path(
    get,
    path = "/generators",
    tag = IMAGES_TAG,
    responses(
        (status = 200, description = "Available generators", body = GeneratorsResponse),
        (status = 503, response = ServiceUnavailableResponse)
    )
)]
async fn list_generators(
    State(state): State<Arc<ImagesState>>,
) -> WallpaperResult<Json<GeneratorsResponse>> {
    Ok(Json(state.generator.generators().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockImageGenerator;
    use crate::repository::{CatalogRepository, InMemoryWallpaperRepository};
    use crate::vector::InMemoryFeatureStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn app(generator: MockImageGenerator) -> Router {
        let repo = InMemoryWallpaperRepository::new();
        repo.get_or_create_category("nature").await.unwrap();
        let service = WallpaperService::new(
            Arc::new(repo.clone()),
            Arc::new(repo),
            Arc::new(InMemoryFeatureStore::new()),
        );
        router(Arc::new(generator), service)
    }

    fn generate(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/generate")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_generate_unknown_category() {
        let app = app(MockImageGenerator::new()).await;

        let response = app
            .oneshot(generate(json!({
                "prompt": "city lights",
                "width": 1920,
                "height": 1080,
                "category": "cities"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "Category not found");
    }

    #[tokio::test]
    async fn test_generate_returns_pending_task() {
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .withf(|req| req.prompt == "misty forest" && req.width == 1920)
            .returning(|_| {
                Ok(GenerateResponse {
                    task_id: Some("task-9".into()),
                    saved_path_url: String::new(),
                    status: "queued".into(),
                    error: None,
                })
            });
        let app = app(generator).await;

        let response = app
            .oneshot(generate(json!({
                "prompt": "misty forest",
                "width": 1920,
                "height": 1080,
                "category": "nature"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "status": "pending", "task_id": "task-9" })
        );
    }

    #[tokio::test]
    async fn test_generate_without_task_or_path_fails() {
        let mut generator = MockImageGenerator::new();
        generator.expect_generate().returning(|_| {
            Ok(GenerateResponse {
                task_id: None,
                saved_path_url: String::new(),
                status: "failed".into(),
                error: Some("quota".into()),
            })
        });
        let app = app(generator).await;

        let response = app
            .oneshot(generate(json!({
                "prompt": "misty forest",
                "width": 1920,
                "height": 1080,
                "category": "nature"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_prompt() {
        let app = app(MockImageGenerator::new()).await;

        let response = app
            .oneshot(generate(json!({
                "prompt": "",
                "width": 1920,
                "height": 1080,
                "category": "nature"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_status_passes_through() {
        let mut generator = MockImageGenerator::new();
        generator
            .expect_status()
            .withf(|id| id == "task-9")
            .returning(|_| {
                Ok(GenerateResponse {
                    task_id: Some("task-9".into()),
                    saved_path_url: "/static/images/a.png".into(),
                    status: "completed".into(),
                    error: None,
                })
            });
        let app = app(generator).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/status/task-9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["saved_path_url"], "/static/images/a.png");
    }

    #[tokio::test]
    async fn test_status_rejects_encoded_path_in_task_id() {
        // no expectations: forwarding the id would panic
        let app = app(MockImageGenerator::new()).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/status/..%2F..%2Fadmin%2Fpurge")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
