//! Horizontal scaling.
//!
//! Scaling never edits the Cluster directly. The operation reads the current
//! replica count, turns the difference into a single HorizontalScaling
//! OpsRequest, and then follows that OpsRequest's phase, not the cluster's.
//! The OpsRequest is submitted with `generateName`, so repeated scale calls
//! never collide on a name.

use super::{OperationContext, OpsRequestPhaseSource};
use crate::error::OpsError;
use crate::poller::{poll, Absence, PollPolicy};
use cluster_client::ClientError;
use crds::{HorizontalScaling, OpsPhase, OpsRequest, OpsRequestSpec, OpsType};
use tracing::info;

/// Done on `Succeed`; `Failed`, `Cancelled` and `Aborted` are terminal failures.
pub const SCALE_POLICY: PollPolicy<OpsPhase> = PollPolicy {
    succeeded: |phase| *phase == OpsPhase::Succeed,
    failed: |phase| matches!(phase, OpsPhase::Failed | OpsPhase::Cancelled | OpsPhase::Aborted),
    on_absent: Absence::Error,
};

/// What a scale call would do
#[derive(Debug, Clone, PartialEq)]
pub enum ScalePlan {
    /// Already at the target; nothing to submit
    Unchanged {
        /// Current and target replica count
        replicas: i32,
    },
    /// Submit `request` to go from `current` to `target`
    Submit {
        /// Replicas the cluster has now
        current: i32,
        /// Replicas asked for
        target: i32,
        /// OpsRequest to create, named by `generateName`
        request: OpsRequest,
    },
}

/// Result of a completed scale call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleOutcome {
    /// Nothing was submitted
    Unchanged {
        /// Replica count the cluster already had
        replicas: i32,
    },
    /// An OpsRequest ran to `Succeed`
    Scaled {
        /// Replicas before
        from: i32,
        /// Replicas after
        to: i32,
        /// Server-assigned OpsRequest name
        ops_request: String,
    },
}

/// Scales the managed component to a target replica count
#[derive(Debug, Clone)]
pub struct ScaleOperation {
    ctx: OperationContext,
}

impl ScaleOperation {
    /// Scale operation over `ctx`
    pub fn new(ctx: OperationContext) -> Self {
        Self { ctx }
    }

    /// Read the cluster and work out what, if anything, to submit.
    pub async fn plan(&self, name: &str, target: i32) -> Result<ScalePlan, OpsError> {
        if target < 1 {
            return Err(OpsError::InvalidReplicas(target));
        }
        let component = &self.ctx.config.component.name;

        let cluster = self
            .ctx
            .client
            .get_cluster(name)
            .await
            .map_err(|e| OpsError::submission("get cluster", name, e))?;

        let current = cluster
            .spec
            .component(component)
            .map(|c| c.replicas)
            .ok_or_else(|| OpsError::ComponentNotFound {
                cluster: name.to_string(),
                component: component.clone(),
            })?;

        if current == target {
            return Ok(ScalePlan::Unchanged { replicas: current });
        }

        let delta = target - current;
        let directive = HorizontalScaling::for_delta(component.clone(), delta)
            .ok_or(OpsError::InvalidReplicas(target))?;

        let mut request = OpsRequest::new(
            "",
            OpsRequestSpec {
                cluster_name: name.to_string(),
                ops_type: OpsType::HorizontalScaling,
                horizontal_scaling: vec![directive],
            },
        );
        request.metadata.name = None;
        request.metadata.generate_name = Some(format!("{}-scale-", name));
        request.metadata.namespace = Some(self.ctx.client.namespace().to_string());

        Ok(ScalePlan::Submit {
            current,
            target,
            request,
        })
    }

    /// Scale cluster `name` to `target` replicas and wait for the OpsRequest
    /// to finish.
    pub async fn run(&self, name: &str, target: i32) -> Result<ScaleOutcome, OpsError> {
        let mut ticker = self.ctx.clock.ticker(&self.ctx.config.scale_poll);

        let plan = self
            .ctx
            .before_deadline(ticker.as_ref(), "Cluster", name, self.plan(name, target))
            .await??;
        let (current, request) = match plan {
            ScalePlan::Unchanged { replicas } => {
                info!("Cluster {} already has {} replicas, nothing to do", name, replicas);
                return Ok(ScaleOutcome::Unchanged { replicas });
            }
            ScalePlan::Submit {
                current, request, ..
            } => (current, request),
        };

        let prefix = request.metadata.generate_name.clone().unwrap_or_default();
        let created = self
            .ctx
            .before_deadline(
                ticker.as_ref(),
                "OpsRequest",
                &prefix,
                self.ctx.client.create_ops_request(&request),
            )
            .await?
            .map_err(|e| OpsError::submission("submit scaling request for", name, e))?;
        let ops_name = created.metadata.name.ok_or_else(|| {
            OpsError::submission(
                "submit scaling request for",
                name,
                ClientError::MissingName(self.ctx.describe("OpsRequest", &prefix)),
            )
        })?;
        info!(
            "Submitted OpsRequest {} to scale {} component {} from {} to {} replicas",
            ops_name, name, self.ctx.config.component.name, current, target
        );

        let source = OpsRequestPhaseSource::new(&self.ctx, &ops_name);
        poll(ticker.as_mut(), &source, &SCALE_POLICY).await?;

        info!("Cluster {} scaled to {} replicas", name, target);
        Ok(ScaleOutcome::Scaled {
            from: current,
            to: target,
            ops_request: ops_name,
        })
    }
}
