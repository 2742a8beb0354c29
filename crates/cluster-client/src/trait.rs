//! ClusterClient trait for mocking
//!
//! This trait abstracts the Kubernetes calls the lifecycle operations make so
//! they can run against `MockClusterClient` in unit tests. It is deliberately
//! narrow: create, get and delete, no update, patch or list.

use crate::error::ClientError;
use crds::{Cluster, OpsRequest};

/// Trait for the resource store the lifecycle operations talk to
///
/// Every object lives in the single namespace returned by `namespace()`.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    /// Namespace all objects are created in and read from
    fn namespace(&self) -> &str;

    /// Create the namespace itself. Returns `AlreadyExists` if present.
    async fn create_namespace(&self) -> Result<(), ClientError>;

    async fn create_cluster(&self, cluster: &Cluster) -> Result<Cluster, ClientError>;
    async fn get_cluster(&self, name: &str) -> Result<Cluster, ClientError>;
    async fn delete_cluster(&self, name: &str) -> Result<(), ClientError>;

    /// Create an OpsRequest. The returned object carries the server-assigned
    /// name when the request was submitted with `generateName`.
    async fn create_ops_request(&self, request: &OpsRequest) -> Result<OpsRequest, ClientError>;
    async fn get_ops_request(&self, name: &str) -> Result<OpsRequest, ClientError>;
}
