//! Integration tests for the Kubernetes cluster client
//!
//! These tests require a reachable Kubernetes cluster with KubeBlocks
//! installed. Set KBOPS_TEST_NAMESPACE to pick the namespace (default "demo").

use cluster_client::{ensure_namespace, ClusterClientTrait, KubeClusterClient};

fn namespace() -> String {
    std::env::var("KBOPS_TEST_NAMESPACE").unwrap_or_else(|_| "demo".to_string())
}

#[tokio::test]
#[ignore] // Requires a running cluster
async fn test_client_creation() {
    let client = KubeClusterClient::try_default(namespace())
        .await
        .expect("Failed to create client");

    ensure_namespace(&client).await.expect("Failed to ensure namespace");
    // Second call must be a no-op
    ensure_namespace(&client).await.expect("Namespace bootstrap is not idempotent");
}

#[tokio::test]
#[ignore]
async fn test_missing_cluster_is_not_found() {
    let client = KubeClusterClient::try_default(namespace())
        .await
        .expect("Failed to create client");

    let err = client
        .get_cluster("kbops-integration-does-not-exist")
        .await
        .expect_err("Cluster should not exist");
    assert!(err.is_not_found(), "Expected NotFound, got {}", err);
}

#[tokio::test]
#[ignore]
async fn test_missing_ops_request_is_not_found() {
    let client = KubeClusterClient::try_default(namespace())
        .await
        .expect("Failed to create client");

    let err = client
        .get_ops_request("kbops-integration-does-not-exist")
        .await
        .expect_err("OpsRequest should not exist");
    assert!(err.is_not_found(), "Expected NotFound, got {}", err);
}
