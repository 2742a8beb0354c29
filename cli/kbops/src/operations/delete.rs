//! Cluster deletion.
//!
//! Deletion has no ready phase of its own: the operation succeeds when a
//! read of the cluster comes back not-found, and the only failure besides a
//! read error is running out of time.

use super::{ClusterPhaseSource, OperationContext};
use crate::error::OpsError;
use crate::poller::{poll, Absence, PollPolicy};
use crds::ClusterPhase;
use tracing::info;

/// Done once the cluster is gone; no phase counts as success or failure.
pub const DELETE_POLICY: PollPolicy<ClusterPhase> = PollPolicy {
    succeeded: |_| false,
    failed: |_| false,
    on_absent: Absence::Success,
};

/// Deletes a cluster and waits until it can no longer be read
#[derive(Debug, Clone)]
pub struct DeleteOperation {
    ctx: OperationContext,
}

impl DeleteOperation {
    /// Delete operation over `ctx`
    pub fn new(ctx: OperationContext) -> Self {
        Self { ctx }
    }

    /// Delete cluster `name` and wait until reads return not-found.
    pub async fn run(&self, name: &str) -> Result<(), OpsError> {
        let mut ticker = self.ctx.clock.ticker(&self.ctx.config.delete_poll);

        self.ctx
            .before_deadline(ticker.as_ref(), "Cluster", name, self.ctx.client.delete_cluster(name))
            .await?
            .map_err(|e| OpsError::submission("delete cluster", name, e))?;
        info!("Cluster {} is being deleted", name);

        let source = ClusterPhaseSource::new(&self.ctx, name);
        poll(ticker.as_mut(), &source, &DELETE_POLICY).await?;

        info!("Cluster {} deleted", name);
        Ok(())
    }
}
