//! Kubernetes-backed cluster client
//!
//! Implements `ClusterClientTrait` on top of `kube::Api` handles for the
//! KubeBlocks Cluster and OpsRequest resources.

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClientError;
use crds::{Cluster, OpsRequest};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

/// Cluster client backed by the Kubernetes API server
pub struct KubeClusterClient {
    namespace: String,
    namespaces: Api<Namespace>,
    clusters: Api<Cluster>,
    ops_requests: Api<OpsRequest>,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    /// Create a client for `namespace` from an existing kube client
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespaces: Api::all(client.clone()),
            clusters: Api::namespaced(client.clone(), &namespace),
            ops_requests: Api::namespaced(client, &namespace),
            namespace,
        }
    }

    /// Create a client from the ambient kubeconfig or in-cluster config
    pub async fn try_default(namespace: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::try_default().await?;
        Ok(Self::new(client, namespace))
    }

    fn describe(&self, kind: &str, name: &str) -> String {
        format!("{} {}/{}", kind, self.namespace, name)
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn create_namespace(&self) -> Result<(), ClientError> {
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(self.namespace.clone()),
                ..Default::default()
            },
            ..Default::default()
        };
        debug!("Creating namespace {}", self.namespace);
        self.namespaces
            .create(&PostParams::default(), &ns)
            .await
            .map_err(|e| ClientError::from_kube(e, &format!("Namespace {}", self.namespace)))?;
        Ok(())
    }

    async fn create_cluster(&self, cluster: &Cluster) -> Result<Cluster, ClientError> {
        let name = cluster.metadata.name.as_deref().unwrap_or_default();
        debug!("Creating {}", self.describe("Cluster", name));
        self.clusters
            .create(&PostParams::default(), cluster)
            .await
            .map_err(|e| ClientError::from_kube(e, &self.describe("Cluster", name)))
    }

    async fn get_cluster(&self, name: &str) -> Result<Cluster, ClientError> {
        self.clusters
            .get(name)
            .await
            .map_err(|e| ClientError::from_kube(e, &self.describe("Cluster", name)))
    }

    async fn delete_cluster(&self, name: &str) -> Result<(), ClientError> {
        debug!("Deleting {}", self.describe("Cluster", name));
        self.clusters
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| ClientError::from_kube(e, &self.describe("Cluster", name)))?;
        Ok(())
    }

    async fn create_ops_request(&self, request: &OpsRequest) -> Result<OpsRequest, ClientError> {
        let hint = request
            .metadata
            .name
            .as_deref()
            .or(request.metadata.generate_name.as_deref())
            .unwrap_or_default();
        debug!("Creating {}", self.describe("OpsRequest", hint));
        let created = self
            .ops_requests
            .create(&PostParams::default(), request)
            .await
            .map_err(|e| ClientError::from_kube(e, &self.describe("OpsRequest", hint)))?;
        if created.metadata.name.is_none() {
            return Err(ClientError::MissingName(self.describe("OpsRequest", hint)));
        }
        Ok(created)
    }

    async fn get_ops_request(&self, name: &str) -> Result<OpsRequest, ClientError> {
        self.ops_requests
            .get(name)
            .await
            .map_err(|e| ClientError::from_kube(e, &self.describe("OpsRequest", name)))
    }
}
