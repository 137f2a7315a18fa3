//! HTTP middleware.

pub mod api_key;
pub mod security;

pub use api_key::{API_KEY_HEADER, ApiKey, require_api_key};
pub use security::security_headers;
