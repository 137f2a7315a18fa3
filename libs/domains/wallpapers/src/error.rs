use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WallpaperError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Feature vector {0} not found")]
    FeatureNotFound(i64),

    #[error("Feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Feature extraction failed: {0}")]
    Extraction(String),

    #[error("Image generator error: {0}")]
    Generator(String),

    #[error("Stores out of sync: {0}")]
    CrossStoreInconsistency(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type WallpaperResult<T> = Result<T, WallpaperError>;

impl WallpaperError {
    pub fn wallpaper_not_found(id: i32) -> Self {
        WallpaperError::NotFound(format!("Wallpaper {} not found", id))
    }
}

impl From<sea_orm::DbErr> for WallpaperError {
    fn from(err: sea_orm::DbErr) -> Self {
        WallpaperError::Database(err.to_string())
    }
}

impl From<qdrant_client::QdrantError> for WallpaperError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        WallpaperError::VectorStore(err.to_string())
    }
}

/// Convert WallpaperError to AppError for standardized error responses
impl From<WallpaperError> for AppError {
    fn from(err: WallpaperError) -> Self {
        match err {
            WallpaperError::Validation(msg) => AppError::BadRequest(msg),
            WallpaperError::NotFound(msg) => AppError::NotFound(msg),
            WallpaperError::FeatureNotFound(id) => {
                AppError::NotFound(format!("Feature vector {} not found", id))
            }
            e @ WallpaperError::DimensionMismatch { .. } => {
                AppError::InternalServerError(e.to_string())
            }
            WallpaperError::VectorStore(msg) => {
                AppError::ServiceUnavailable(format!("Vector store error: {}", msg))
            }
            WallpaperError::Extraction(msg) => {
                AppError::ServiceUnavailable(format!("Feature extraction failed: {}", msg))
            }
            WallpaperError::Generator(msg) => {
                AppError::ServiceUnavailable(format!("Image generator error: {}", msg))
            }
            WallpaperError::CrossStoreInconsistency(msg) => AppError::InternalServerError(msg),
            WallpaperError::Database(msg) => {
                AppError::InternalServerError(format!("Database error: {}", msg))
            }
            WallpaperError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for WallpaperError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
