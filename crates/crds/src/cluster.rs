//! Cluster CRD
//!
//! The managed database cluster (`apps.kubeblocks.io/v1`). kbops writes the
//! spec once on creation and afterwards only reads `status.phase` and the
//! component replica counts.

use k8s_openapi::api::core::v1::{PersistentVolumeClaimSpec, ResourceRequirements};
use kube::CustomResource;
use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "apps.kubeblocks.io",
    version = "v1",
    kind = "Cluster",
    namespaced,
    status = "ClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// What happens to data and backups when the cluster is deleted
    pub termination_policy: TerminationPolicy,

    /// Name of the ClusterDefinition (e.g., "postgresql")
    pub cluster_def: String,

    /// Topology within the ClusterDefinition (e.g., "replication")
    pub topology: String,

    /// Per-component specifications
    #[serde(default)]
    pub component_specs: Vec<ClusterComponentSpec>,
}

impl ClusterSpec {
    /// Find a component by name.
    pub fn component(&self, name: &str) -> Option<&ClusterComponentSpec> {
        self.component_specs.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum TerminationPolicy {
    /// Block deletion entirely
    DoNotTerminate,

    /// Delete workloads and volumes, keep backups
    Delete,

    /// Delete everything, backups included
    #[default]
    WipeOut,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterComponentSpec {
    /// Component name, unique within the cluster
    pub name: String,

    /// Engine version (e.g., "14.7.2")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_version: Option<String>,

    /// Disable the metrics exporter sidecar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_exporter: Option<bool>,

    /// Extra labels for the component's pods
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Desired replica count
    pub replicas: i32,

    /// CPU and memory requests and limits
    #[serde(default)]
    #[schemars(schema_with = "crate::preserve_unknown_fields")]
    pub resources: ResourceRequirements,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_claim_templates: Vec<VolumeClaimTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeClaimTemplate {
    /// Volume name as referenced by the component (e.g., "data")
    pub name: String,

    #[schemars(schema_with = "crate::preserve_unknown_fields")]
    pub spec: PersistentVolumeClaimSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Observed phase; unset (or empty) while the cluster is first being
    /// provisioned
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::phase_or_unset"
    )]
    #[schemars(with = "Option<ClusterPhase>")]
    pub phase: Option<ClusterPhase>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Cluster phase as reported by KubeBlocks
///
/// Values this crate does not know are kept verbatim in `Unknown` so a newer
/// KubeBlocks release never breaks status reads and logs still show what the
/// server said.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum ClusterPhase {
    Creating,
    Running,
    Updating,
    Stopping,
    Stopped,
    Deleting,
    Failed,
    Abnormal,
    Unknown(String),
}

impl ClusterPhase {
    /// Wire form of the phase
    pub fn as_str(&self) -> &str {
        match self {
            ClusterPhase::Creating => "Creating",
            ClusterPhase::Running => "Running",
            ClusterPhase::Updating => "Updating",
            ClusterPhase::Stopping => "Stopping",
            ClusterPhase::Stopped => "Stopped",
            ClusterPhase::Deleting => "Deleting",
            ClusterPhase::Failed => "Failed",
            ClusterPhase::Abnormal => "Abnormal",
            ClusterPhase::Unknown(raw) => raw,
        }
    }
}

impl From<String> for ClusterPhase {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Creating" => ClusterPhase::Creating,
            "Running" => ClusterPhase::Running,
            "Updating" => ClusterPhase::Updating,
            "Stopping" => ClusterPhase::Stopping,
            "Stopped" => ClusterPhase::Stopped,
            "Deleting" => ClusterPhase::Deleting,
            "Failed" => ClusterPhase::Failed,
            "Abnormal" => ClusterPhase::Abnormal,
            _ => ClusterPhase::Unknown(raw),
        }
    }
}

impl From<ClusterPhase> for String {
    fn from(phase: ClusterPhase) -> Self {
        match phase {
            ClusterPhase::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl JsonSchema for ClusterPhase {
    fn schema_name() -> Cow<'static, str> {
        "ClusterPhase".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        crate::string_schema(generator)
    }
}

impl fmt::Display for ClusterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Cluster {
    /// Observed phase, `None` when status or phase is not yet set.
    pub fn phase(&self) -> Option<&ClusterPhase> {
        self.status.as_ref().and_then(|s| s.phase.as_ref())
    }
}
