//! # Axum Helpers
//!
//! Shared building blocks for the HTTP services in this workspace.
//!
//! - **[`server`]**: router assembly with API docs, health checks, graceful shutdown
//! - **[`middleware`]**: security headers and the `X-API-Key` guard
//! - **[`errors`]**: structured error responses with error codes
//! - **[`extractors`]**: validated JSON bodies and integer path ids

pub mod errors;
pub mod extractors;
pub mod middleware;
pub mod server;

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, run_health_checks, shutdown_signal,
};

pub use middleware::{API_KEY_HEADER, ApiKey, require_api_key, security_headers};

pub use errors::{AppError, ErrorCode, ErrorResponse};

pub use extractors::{IdPath, ValidatedJson};
