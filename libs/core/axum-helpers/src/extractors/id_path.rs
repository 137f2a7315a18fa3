//! Integer path parameter extractor.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

/// Extractor for positive `i32` ids in the path.
///
/// A segment that is not a positive integer yields `400 Bad Request`
/// with the structured error body instead of axum's plain-text rejection.
///
/// # Example
/// ```ignore
/// use axum::Router;
/// use axum::routing::get;
/// use axum_helpers::extractors::IdPath;
///
/// async fn get_wallpaper(IdPath(id): IdPath) -> String {
///     format!("Wallpaper {}", id)
/// }
///
/// let app = Router::new().route("/wallpapers/{id}", get(get_wallpaper));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdPath(pub i32);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        match raw.parse::<i32>() {
            Ok(id) if id > 0 => Ok(IdPath(id)),
            _ => Err(AppError::BadRequest(format!("Invalid id: {}", raw))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, http::StatusCode, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new().route(
            "/items/{id}",
            get(|IdPath(id): IdPath| async move { id.to_string() }),
        )
    }

    async fn status_of(uri: &str) -> StatusCode {
        app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_accepts_positive_integer() {
        assert_eq!(status_of("/items/42").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejects_non_integer() {
        assert_eq!(status_of("/items/abc").await, StatusCode::BAD_REQUEST);
        assert_eq!(status_of("/items/0").await, StatusCode::BAD_REQUEST);
        assert_eq!(status_of("/items/-3").await, StatusCode::BAD_REQUEST);
    }
}
