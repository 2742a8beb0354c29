//! Cluster creation.
//!
//! Builds the Cluster manifest from `OpsConfig`, submits it once, and waits
//! for the cluster to report `Running`. A failed create is left in place for
//! inspection; nothing is rolled back.

use super::{ClusterPhaseSource, OperationContext};
use crate::error::OpsError;
use crate::poller::{poll, Absence, PollPolicy};
use crds::{Cluster, ClusterComponentSpec, ClusterPhase, ClusterSpec, VolumeClaimTemplate};
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaimSpec, ResourceRequirements, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;
use tracing::info;

/// Ready on `Running`; `Failed` and `Abnormal` are terminal failures.
pub const CREATE_POLICY: PollPolicy<ClusterPhase> = PollPolicy {
    succeeded: |phase| *phase == ClusterPhase::Running,
    failed: |phase| matches!(phase, ClusterPhase::Failed | ClusterPhase::Abnormal),
    on_absent: Absence::Error,
};

/// Label KubeBlocks' Patroni integration uses to scope a PostgreSQL cluster
const PATRONI_SCOPE_LABEL: &str = "apps.kubeblocks.postgres.patroni/scope";

/// Creates a cluster and waits for it to become ready
#[derive(Debug, Clone)]
pub struct CreateOperation {
    ctx: OperationContext,
}

impl CreateOperation {
    /// Create operation over `ctx`
    pub fn new(ctx: OperationContext) -> Self {
        Self { ctx }
    }

    /// Render the Cluster this operation would submit for `name`.
    pub fn build_cluster(&self, name: &str) -> Cluster {
        let config = &self.ctx.config;
        let component = &config.component;

        let quantities = |pairs: &[(&str, &str)]| -> BTreeMap<String, Quantity> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
                .collect()
        };

        let mut labels = BTreeMap::new();
        labels.insert(
            PATRONI_SCOPE_LABEL.to_string(),
            format!("{}-{}", name, component.name),
        );

        let spec = ClusterSpec {
            termination_policy: config.termination_policy.clone(),
            cluster_def: config.cluster_definition.clone(),
            topology: config.topology.clone(),
            component_specs: vec![ClusterComponentSpec {
                name: component.name.clone(),
                service_version: Some(component.service_version.clone()),
                disable_exporter: Some(component.disable_exporter),
                labels,
                replicas: component.replicas,
                resources: ResourceRequirements {
                    requests: Some(quantities(&[
                        ("cpu", component.cpu_request.as_str()),
                        ("memory", component.memory_request.as_str()),
                    ])),
                    limits: Some(quantities(&[
                        ("cpu", component.cpu_limit.as_str()),
                        ("memory", component.memory_limit.as_str()),
                    ])),
                    ..Default::default()
                },
                volume_claim_templates: vec![VolumeClaimTemplate {
                    name: "data".to_string(),
                    spec: PersistentVolumeClaimSpec {
                        access_modes: Some(vec!["ReadWriteOnce".to_string()]),
                        resources: Some(VolumeResourceRequirements {
                            requests: Some(quantities(&[(
                                "storage",
                                component.storage_size.as_str(),
                            )])),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                }],
            }],
        };

        let mut cluster = Cluster::new(name, spec);
        cluster.metadata.namespace = Some(self.ctx.client.namespace().to_string());
        cluster
    }

    /// Submit the cluster and wait until it is `Running`.
    pub async fn run(&self, name: &str) -> Result<(), OpsError> {
        let mut ticker = self.ctx.clock.ticker(&self.ctx.config.create_poll);
        let cluster = self.build_cluster(name);

        self.ctx
            .before_deadline(
                ticker.as_ref(),
                "Cluster",
                name,
                self.ctx.client.create_cluster(&cluster),
            )
            .await?
            .map_err(|e| {
                if e.is_already_exists() {
                    OpsError::AlreadyExists(name.to_string())
                } else {
                    OpsError::submission("create cluster", name, e)
                }
            })?;
        info!("Cluster {} creation submitted, waiting for it to become ready", name);

        let source = ClusterPhaseSource::new(&self.ctx, name);
        poll(ticker.as_mut(), &source, &CREATE_POLICY).await?;

        info!("Cluster {} is up and running", name);
        Ok(())
    }
}
