//! Shared-secret guard for administrative routes.
//!
//! Requests must carry the configured key in the `X-API-Key` header. When no
//! key is configured every request is rejected.

use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Expected key for [`require_api_key`]. `None` locks the routes.
#[derive(Clone, Default)]
pub struct ApiKey(Option<Arc<str>>);

impl ApiKey {
    pub fn new(key: Option<String>) -> Self {
        Self(key.filter(|k| !k.is_empty()).map(Arc::from))
    }

    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    /// Checks a presented key against the configured one.
    pub fn verify(&self, presented: &str) -> bool {
        match &self.0 {
            Some(expected) => constant_time_eq(expected.as_bytes(), presented.as_bytes()),
            None => false,
        }
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiKey")
            .field(&self.0.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Compares two byte strings without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware rejecting requests without a valid `X-API-Key`.
///
/// ```ignore
/// let admin = Router::new()
///     .route("/wallpapers", post(create))
///     .layer(middleware::from_fn_with_state(api_key, require_api_key));
/// ```
pub async fn require_api_key(
    State(key): State<ApiKey>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !key.is_configured() {
        tracing::warn!("Rejecting admin request: ADMIN_API_KEY is not configured");
        return Err(AppError::Unauthorized("API key is not configured".to_string()));
    }

    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !key.verify(presented) {
        return Err(AppError::Unauthorized("Invalid or missing API key".to_string()));
    }

    Ok(next.run(request).await)
}
