//! KubeBlocks cluster client
//!
//! A small client for the two KubeBlocks resources kbops drives: the
//! `Cluster` itself and the `OpsRequest` objects used to change it.
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ensure_namespace, ClusterClientTrait, KubeClusterClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeClusterClient::try_default("demo").await?;
//! ensure_namespace(&client).await?;
//!
//! let cluster = client.get_cluster("op-test").await?;
//! println!("phase: {:?}", cluster.phase());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeClusterClient;
pub use cluster_trait::ClusterClientTrait;
pub use error::ClientError;
#[cfg(feature = "test-util")]
pub use mock::{DeleteLag, MockClusterClient};

use tracing::debug;

/// Make sure the client's namespace exists.
///
/// An existing namespace is fine; this is the only place AlreadyExists is
/// not an error.
pub async fn ensure_namespace(client: &dyn ClusterClientTrait) -> Result<(), ClientError> {
    match client.create_namespace().await {
        Ok(()) => {
            debug!("Created namespace {}", client.namespace());
            Ok(())
        }
        Err(e) if e.is_already_exists() => {
            debug!("Namespace {} already exists", client.namespace());
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(all(test, feature = "test-util"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_namespace_creates_missing() {
        let client = MockClusterClient::new("demo");
        ensure_namespace(&client).await.unwrap();
        assert!(client.has_namespace());
    }

    #[tokio::test]
    async fn test_ensure_namespace_tolerates_existing() {
        let client = MockClusterClient::new("demo");
        client.add_namespace();
        ensure_namespace(&client).await.unwrap();
        assert!(client.has_namespace());
    }
}
