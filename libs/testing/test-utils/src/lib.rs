//! Shared test utilities for domain testing
//!
//! This crate provides reusable test infrastructure for the domain crates:
//! - `TestDatabase`: PostgreSQL container with the schema migrated (feature: "postgres")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `TestQdrant`: Qdrant container for the vector store adapter (always available)
//! - `vectors`: Feature vectors with predictable cosine similarity (always available)
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{TestDatabase, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn my_postgres_test() {
//!     let db = TestDatabase::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_test");
//!
//!     let image_url = builder.image_url("aurora");
//! }
//! ```

#[cfg(feature = "postgres")]
mod postgres;

mod qdrant;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;
pub use qdrant::TestQdrant;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_create_wallpaper");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Image path unique to this builder
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("my_test");
    /// assert!(builder.image_url("sky").ends_with("-sky.jpg"));
    /// ```
    pub fn image_url(&self, suffix: &str) -> String {
        format!("/images/{}-{}.jpg", self.seed, suffix)
    }
}

/// Feature vectors for similarity tests
pub mod vectors {
    /// Vector of `dimension` values pointing along `axis`, tilted towards
    /// `axis + 1` by `tilt`. Its cosine similarity to `tilted(dimension, axis, 0.0)`
    /// is `1 / sqrt(1 + tilt²)`, so larger tilts rank lower.
    pub fn tilted(dimension: usize, axis: usize, tilt: f32) -> Vec<f32> {
        assert!(axis + 1 < dimension, "axis out of range");
        let mut v = vec![0.0; dimension];
        v[axis] = 1.0;
        v[axis + 1] = tilt;
        v
    }
}
