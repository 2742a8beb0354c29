//! Lifecycle operations.
//!
//! Each operation submits exactly one change and then hands over to the
//! poller:
//!
//! - `create` – submit a Cluster, wait for `Running`
//! - `delete` – delete the Cluster, wait until it is gone
//! - `scale` – submit a HorizontalScaling OpsRequest, wait for `Succeed`
//!
//! All three share an `OperationContext` carrying the resource client, the
//! clock and the configuration.

pub mod create;
pub mod delete;
pub mod scale;

pub use create::CreateOperation;
pub use delete::DeleteOperation;
pub use scale::{ScaleOperation, ScaleOutcome, ScalePlan};

use crate::clock::{within, Clock, Ticker};
use crate::config::OpsConfig;
use crate::error::OpsError;
use crate::poller::{Observation, PhaseSource, PollError};
use cluster_client::{ClientError, ClusterClientTrait};
use crds::{ClusterPhase, OpsPhase};
use std::future::Future;
use std::sync::Arc;

/// Collaborators shared by every operation
#[derive(Clone)]
pub struct OperationContext {
    /// Kubernetes access, scoped to one namespace
    pub client: Arc<dyn ClusterClientTrait>,
    /// Source of poll tickers
    pub clock: Arc<dyn Clock>,
    /// Cluster template and poll timings
    pub config: Arc<OpsConfig>,
}

impl std::fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationContext")
            .field("namespace", &self.client.namespace())
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish()
    }
}

impl OperationContext {
    /// Bundle the collaborators one invocation needs.
    pub fn new(client: Arc<dyn ClusterClientTrait>, clock: Arc<dyn Clock>, config: OpsConfig) -> Self {
        Self {
            client,
            clock,
            config: Arc::new(config),
        }
    }

    fn describe(&self, kind: &str, name: &str) -> String {
        format!("{} {}/{}", kind, self.client.namespace(), name)
    }

    /// Run an API call under the operation's deadline. Expiry is reported
    /// as a timeout on `kind`/`name`.
    async fn before_deadline<F: Future>(
        &self,
        ticker: &dyn Ticker,
        kind: &str,
        name: &str,
        call: F,
    ) -> Result<F::Output, OpsError> {
        within(ticker, call)
            .await
            .ok_or_else(|| PollError::timeout(self.describe(kind, name), ticker).into())
    }
}

/// Polls `status.phase` of a Cluster
pub(crate) struct ClusterPhaseSource<'a> {
    ctx: &'a OperationContext,
    name: &'a str,
}

impl<'a> ClusterPhaseSource<'a> {
    pub(crate) fn new(ctx: &'a OperationContext, name: &'a str) -> Self {
        Self { ctx, name }
    }
}

#[async_trait::async_trait]
impl PhaseSource for ClusterPhaseSource<'_> {
    type Phase = ClusterPhase;

    fn describe(&self) -> String {
        self.ctx.describe("Cluster", self.name)
    }

    async fn observe(&self) -> Result<Observation<ClusterPhase>, ClientError> {
        match self.ctx.client.get_cluster(self.name).await {
            Ok(cluster) => Ok(Observation::Present(cluster.phase().cloned())),
            Err(e) if e.is_not_found() => Ok(Observation::Absent),
            Err(e) => Err(e),
        }
    }
}

/// Polls `status.phase` of an OpsRequest
pub(crate) struct OpsRequestPhaseSource<'a> {
    ctx: &'a OperationContext,
    name: &'a str,
}

impl<'a> OpsRequestPhaseSource<'a> {
    pub(crate) fn new(ctx: &'a OperationContext, name: &'a str) -> Self {
        Self { ctx, name }
    }
}

#[async_trait::async_trait]
impl PhaseSource for OpsRequestPhaseSource<'_> {
    type Phase = OpsPhase;

    fn describe(&self) -> String {
        self.ctx.describe("OpsRequest", self.name)
    }

    async fn observe(&self) -> Result<Observation<OpsPhase>, ClientError> {
        match self.ctx.client.get_ops_request(self.name).await {
            Ok(request) => Ok(Observation::Present(request.phase().cloned())),
            Err(e) if e.is_not_found() => Ok(Observation::Absent),
            Err(e) => Err(e),
        }
    }
}
