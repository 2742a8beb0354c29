//! Mock cluster client for unit testing
//!
//! Stores objects in memory and lets tests script what the remote system does
//! between polls: phase transitions, how long a deleted cluster stays visible,
//! and read failures.

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClientError;
use crds::{Cluster, ClusterPhase, ClusterStatus, OpsPhase, OpsRequest, OpsRequestStatus};
use kube::core::ErrorResponse;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// How long a deleted cluster stays readable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteLag {
    /// Visible for this many more reads, then gone
    Reads(usize),
    /// Never disappears (stuck finalizer)
    Forever,
}

/// Mock cluster client for testing
///
/// Phase scripts are consumed one entry per read; the last entry sticks, so a
/// script of `[None, Creating, Running]` reads as unset, then Creating, then
/// Running for every read after that.
#[derive(Clone, Debug)]
pub struct MockClusterClient {
    pub(crate) namespace: String,
    pub(crate) namespaces: Arc<Mutex<HashSet<String>>>,
    pub(crate) clusters: Arc<Mutex<HashMap<String, Cluster>>>,
    pub(crate) cluster_phases: Arc<Mutex<HashMap<String, VecDeque<Option<ClusterPhase>>>>>,
    pub(crate) delete_lags: Arc<Mutex<HashMap<String, DeleteLag>>>,
    pub(crate) deleting: Arc<Mutex<HashMap<String, DeleteLag>>>,
    pub(crate) ops_requests: Arc<Mutex<HashMap<String, OpsRequest>>>,
    pub(crate) ops_phases: Arc<Mutex<VecDeque<Option<OpsPhase>>>>,
    pub(crate) read_failures: Arc<Mutex<VecDeque<String>>>,
    pub(crate) ops_read_failures: Arc<Mutex<VecDeque<String>>>,
    pub(crate) cluster_reads: Arc<Mutex<usize>>,
    pub(crate) ops_reads: Arc<Mutex<usize>>,
    // Every call hangs once set
    pub(crate) stalled: Arc<AtomicBool>,
    // Created OpsRequests come back without a name
    pub(crate) drop_names: Arc<AtomicBool>,
    // Counter for generated names
    pub(crate) next_id: Arc<Mutex<u64>>,
}

impl MockClusterClient {
    /// Create a new mock client scoped to `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            namespaces: Arc::new(Mutex::new(HashSet::new())),
            clusters: Arc::new(Mutex::new(HashMap::new())),
            cluster_phases: Arc::new(Mutex::new(HashMap::new())),
            delete_lags: Arc::new(Mutex::new(HashMap::new())),
            deleting: Arc::new(Mutex::new(HashMap::new())),
            ops_requests: Arc::new(Mutex::new(HashMap::new())),
            ops_phases: Arc::new(Mutex::new(VecDeque::new())),
            read_failures: Arc::new(Mutex::new(VecDeque::new())),
            ops_read_failures: Arc::new(Mutex::new(VecDeque::new())),
            cluster_reads: Arc::new(Mutex::new(0)),
            ops_reads: Arc::new(Mutex::new(0)),
            stalled: Arc::new(AtomicBool::new(false)),
            drop_names: Arc::new(AtomicBool::new(false)),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a cluster to the mock store (for test setup)
    pub fn add_cluster(&self, cluster: Cluster) {
        let name = cluster.metadata.name.clone().unwrap_or_default();
        self.clusters.lock().unwrap().insert(name, cluster);
    }

    /// Mark the namespace as already present
    pub fn add_namespace(&self) {
        self.namespaces.lock().unwrap().insert(self.namespace.clone());
    }

    /// Script the phases successive reads of cluster `name` observe
    pub fn script_cluster_phases(&self, name: &str, phases: Vec<Option<ClusterPhase>>) {
        self.cluster_phases
            .lock()
            .unwrap()
            .insert(name.to_string(), phases.into());
    }

    /// Script the phases successive reads of any OpsRequest observe
    pub fn script_ops_phases(&self, phases: Vec<Option<OpsPhase>>) {
        *self.ops_phases.lock().unwrap() = phases.into();
    }

    /// Control how long cluster `name` stays readable once deleted
    pub fn set_delete_lag(&self, name: &str, lag: DeleteLag) {
        self.delete_lags.lock().unwrap().insert(name.to_string(), lag);
    }

    /// Remove cluster `name` after it has been read `reads` more times,
    /// as if someone else deleted it
    pub fn remove_after_reads(&self, name: &str, reads: usize) {
        self.deleting
            .lock()
            .unwrap()
            .insert(name.to_string(), DeleteLag::Reads(reads));
    }

    /// Make every subsequent call hang, like an unresponsive API server
    pub fn stall(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    /// Return created OpsRequests without `metadata.name`
    pub fn drop_assigned_names(&self) {
        self.drop_names.store(true, Ordering::SeqCst);
    }

    /// Make the next read (cluster or OpsRequest) fail with a server error
    pub fn fail_next_read(&self, message: impl Into<String>) {
        self.read_failures.lock().unwrap().push_back(message.into());
    }

    /// Make the next OpsRequest read fail, leaving cluster reads alone
    pub fn fail_next_ops_read(&self, message: impl Into<String>) {
        self.ops_read_failures.lock().unwrap().push_back(message.into());
    }

    /// Cluster currently stored under `name`
    pub fn cluster(&self, name: &str) -> Option<Cluster> {
        self.clusters.lock().unwrap().get(name).cloned()
    }

    /// All OpsRequests submitted so far
    pub fn ops_requests(&self) -> Vec<OpsRequest> {
        self.ops_requests.lock().unwrap().values().cloned().collect()
    }

    /// Number of cluster reads served
    pub fn cluster_reads(&self) -> usize {
        *self.cluster_reads.lock().unwrap()
    }

    /// Number of OpsRequest reads served
    pub fn ops_reads(&self) -> usize {
        *self.ops_reads.lock().unwrap()
    }

    /// Whether the namespace has been created
    pub fn has_namespace(&self) -> bool {
        self.namespaces.lock().unwrap().contains(&self.namespace)
    }

    pub(crate) fn next_id(&self) -> u64 {
        let mut id = self.next_id.lock().unwrap();
        let current = *id;
        *id += 1;
        current
    }

    fn take_read_failure(&self, queue: &Mutex<VecDeque<String>>) -> Option<ClientError> {
        queue.lock().unwrap().pop_front().map(|message| {
            ClientError::Kube(kube::Error::Api(ErrorResponse {
                status: "Failure".to_string(),
                message,
                reason: "ServiceUnavailable".to_string(),
                code: 503,
            }))
        })
    }

    fn describe(&self, kind: &str, name: &str) -> String {
        format!("{} {}/{}", kind, self.namespace, name)
    }

    async fn wait_if_stalled(&self) {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }

    /// Pop the next scripted value, keeping the last one in place.
    fn advance<T: Clone>(script: &mut VecDeque<T>) -> Option<T> {
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn create_namespace(&self) -> Result<(), ClientError> {
        self.wait_if_stalled().await;
        if !self.namespaces.lock().unwrap().insert(self.namespace.clone()) {
            return Err(ClientError::AlreadyExists(format!("Namespace {}", self.namespace)));
        }
        Ok(())
    }

    async fn create_cluster(&self, cluster: &Cluster) -> Result<Cluster, ClientError> {
        self.wait_if_stalled().await;
        let name = cluster.metadata.name.clone().unwrap_or_default();
        let mut clusters = self.clusters.lock().unwrap();
        if clusters.contains_key(&name) {
            return Err(ClientError::AlreadyExists(self.describe("Cluster", &name)));
        }
        let mut stored = cluster.clone();
        stored.metadata.namespace = Some(self.namespace.clone());
        clusters.insert(name, stored.clone());
        Ok(stored)
    }

    async fn get_cluster(&self, name: &str) -> Result<Cluster, ClientError> {
        self.wait_if_stalled().await;
        *self.cluster_reads.lock().unwrap() += 1;
        if let Some(err) = self.take_read_failure(&self.read_failures) {
            return Err(err);
        }

        {
            let mut deleting = self.deleting.lock().unwrap();
            let gone = match deleting.get_mut(name) {
                Some(DeleteLag::Reads(0)) => true,
                Some(DeleteLag::Reads(remaining)) => {
                    *remaining -= 1;
                    false
                }
                Some(DeleteLag::Forever) | None => false,
            };
            if gone {
                deleting.remove(name);
                self.clusters.lock().unwrap().remove(name);
            }
        }

        let mut cluster = self
            .clusters
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(self.describe("Cluster", name)))?;

        if let Some(script) = self.cluster_phases.lock().unwrap().get_mut(name) {
            if let Some(phase) = Self::advance(script) {
                cluster.status = Some(ClusterStatus {
                    phase,
                    message: None,
                });
            }
        }
        Ok(cluster)
    }

    async fn delete_cluster(&self, name: &str) -> Result<(), ClientError> {
        self.wait_if_stalled().await;
        if !self.clusters.lock().unwrap().contains_key(name) {
            return Err(ClientError::NotFound(self.describe("Cluster", name)));
        }
        let lag = self
            .delete_lags
            .lock()
            .unwrap()
            .remove(name)
            .unwrap_or(DeleteLag::Reads(0));
        self.deleting.lock().unwrap().entry(name.to_string()).or_insert(lag);
        Ok(())
    }

    async fn create_ops_request(&self, request: &OpsRequest) -> Result<OpsRequest, ClientError> {
        self.wait_if_stalled().await;
        let mut created = request.clone();
        let name = match (&request.metadata.name, &request.metadata.generate_name) {
            (Some(name), _) => name.clone(),
            (None, Some(prefix)) => format!("{}{:05x}", prefix, self.next_id()),
            (None, None) => return Err(ClientError::MissingName(self.describe("OpsRequest", ""))),
        };
        let mut ops_requests = self.ops_requests.lock().unwrap();
        if ops_requests.contains_key(&name) {
            return Err(ClientError::AlreadyExists(self.describe("OpsRequest", &name)));
        }
        created.metadata.name = Some(name.clone());
        created.metadata.namespace = Some(self.namespace.clone());
        ops_requests.insert(name, created.clone());
        if self.drop_names.load(Ordering::SeqCst) {
            created.metadata.name = None;
        }
        Ok(created)
    }

    async fn get_ops_request(&self, name: &str) -> Result<OpsRequest, ClientError> {
        self.wait_if_stalled().await;
        *self.ops_reads.lock().unwrap() += 1;
        if let Some(err) = self
            .take_read_failure(&self.ops_read_failures)
            .or_else(|| self.take_read_failure(&self.read_failures))
        {
            return Err(err);
        }
        let mut request = self
            .ops_requests
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(self.describe("OpsRequest", name)))?;

        if let Some(phase) = Self::advance(&mut *self.ops_phases.lock().unwrap()) {
            request.status = Some(OpsRequestStatus {
                phase,
                progress: None,
            });
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{ClusterSpec, TerminationPolicy};

    fn cluster(name: &str) -> Cluster {
        Cluster::new(
            name,
            ClusterSpec {
                termination_policy: TerminationPolicy::Delete,
                cluster_def: "postgresql".to_string(),
                topology: "replication".to_string(),
                component_specs: vec![],
            },
        )
    }

    #[tokio::test]
    async fn test_phase_script_sticks_on_last_entry() {
        let client = MockClusterClient::new("demo");
        client.add_cluster(cluster("op-test"));
        client.script_cluster_phases(
            "op-test",
            vec![None, Some(ClusterPhase::Creating), Some(ClusterPhase::Running)],
        );

        assert_eq!(client.get_cluster("op-test").await.unwrap().phase(), None);
        assert_eq!(
            client.get_cluster("op-test").await.unwrap().phase(),
            Some(&ClusterPhase::Creating)
        );
        for _ in 0..3 {
            assert_eq!(
                client.get_cluster("op-test").await.unwrap().phase(),
                Some(&ClusterPhase::Running)
            );
        }
        assert_eq!(client.cluster_reads(), 5);
    }

    #[tokio::test]
    async fn test_delete_lag() {
        let client = MockClusterClient::new("demo");
        client.add_cluster(cluster("op-test"));
        client.set_delete_lag("op-test", DeleteLag::Reads(1));
        client.delete_cluster("op-test").await.unwrap();

        assert!(client.get_cluster("op-test").await.is_ok());
        assert!(client.get_cluster("op-test").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_generate_name() {
        let client = MockClusterClient::new("demo");
        let mut request = OpsRequest::new(
            "",
            crds::OpsRequestSpec {
                cluster_name: "op-test".to_string(),
                ops_type: crds::OpsType::HorizontalScaling,
                horizontal_scaling: vec![],
            },
        );
        request.metadata.name = None;
        request.metadata.generate_name = Some("op-test-scale-".to_string());

        let first = client.create_ops_request(&request).await.unwrap();
        let second = client.create_ops_request(&request).await.unwrap();
        let first_name = first.metadata.name.unwrap();
        assert!(first_name.starts_with("op-test-scale-"));
        assert_ne!(Some(first_name), second.metadata.name);
    }

    #[tokio::test]
    async fn test_read_failure_is_not_not_found() {
        let client = MockClusterClient::new("demo");
        client.add_cluster(cluster("op-test"));
        client.fail_next_read("connection reset");

        let err = client.get_cluster("op-test").await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(client.get_cluster("op-test").await.is_ok());
    }
}
