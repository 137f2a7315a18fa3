//! Qdrant test infrastructure
//!
//! testcontainers-modules ships no Qdrant image, so this wraps a `GenericImage`.

use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

const GRPC_PORT: u16 = 6334;

/// Throwaway Qdrant server, removed when dropped
pub struct TestQdrant {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    /// gRPC endpoint, e.g. `http://127.0.0.1:49154`
    pub url: String,
}

impl TestQdrant {
    /// ```no_run
    /// use test_utils::TestQdrant;
    ///
    /// # async fn example() {
    /// let qdrant = TestQdrant::new().await;
    /// // Qdrant::from_url(&qdrant.url).build()
    /// # }
    /// ```
    pub async fn new() -> Self {
        let container = GenericImage::new("qdrant/qdrant", "v1.15.1")
            .with_exposed_port(GRPC_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("gRPC listening"))
            .start()
            .await
            .expect("Failed to start Qdrant container");

        let host_port = container
            .get_host_port_ipv4(GRPC_PORT)
            .await
            .expect("Failed to get host port");

        tracing::info!(port = host_port, "Test Qdrant ready");

        Self {
            container,
            url: format!("http://127.0.0.1:{}", host_port),
        }
    }
}
