//! OpsRequest CRD
//!
//! An imperative, one-shot operation against a Cluster
//! (`operations.kubeblocks.io/v1alpha1`). kbops only ever creates
//! horizontal-scaling requests and then watches their phase; KubeBlocks owns
//! everything after submission.

use kube::CustomResource;
use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "operations.kubeblocks.io",
    version = "v1alpha1",
    kind = "OpsRequest",
    namespaced,
    status = "OpsRequestStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct OpsRequestSpec {
    /// Name of the target Cluster (same namespace)
    pub cluster_name: String,

    /// Operation type
    #[serde(rename = "type")]
    pub ops_type: OpsType,

    /// Horizontal scaling directives, one per component
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub horizontal_scaling: Vec<HorizontalScaling>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum OpsType {
    HorizontalScaling,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HorizontalScaling {
    /// Component to scale
    pub component_name: String,

    /// Add replicas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_out: Option<ReplicaChanger>,

    /// Remove replicas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_in: Option<ReplicaChanger>,
}

impl HorizontalScaling {
    /// Build the directive for a signed replica delta.
    ///
    /// A positive delta becomes `scaleOut`, a negative one `scaleIn` carrying
    /// the absolute value. Returns `None` for a zero delta, which has no
    /// meaningful directive.
    pub fn for_delta(component_name: impl Into<String>, delta: i32) -> Option<Self> {
        let (scale_out, scale_in) = match delta {
            0 => return None,
            d if d > 0 => (Some(ReplicaChanger { replica_changes: d }), None),
            d => (None, Some(ReplicaChanger { replica_changes: d.saturating_abs() })),
        };
        Some(Self {
            component_name: component_name.into(),
            scale_out,
            scale_in,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaChanger {
    /// Number of replicas to add or remove (always positive)
    pub replica_changes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OpsRequestStatus {
    /// Observed phase; empty until KubeBlocks picks the request up
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::phase_or_unset"
    )]
    #[schemars(with = "Option<OpsPhase>")]
    pub phase: Option<OpsPhase>,

    /// Progress string such as "1/2"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
}

/// OpsRequest phase as reported by KubeBlocks, unknown values kept verbatim
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum OpsPhase {
    Pending,
    Creating,
    Running,
    Cancelling,
    Cancelled,
    Aborted,
    Succeed,
    Failed,
    Unknown(String),
}

impl OpsPhase {
    /// Wire form of the phase
    pub fn as_str(&self) -> &str {
        match self {
            OpsPhase::Pending => "Pending",
            OpsPhase::Creating => "Creating",
            OpsPhase::Running => "Running",
            OpsPhase::Cancelling => "Cancelling",
            OpsPhase::Cancelled => "Cancelled",
            OpsPhase::Aborted => "Aborted",
            OpsPhase::Succeed => "Succeed",
            OpsPhase::Failed => "Failed",
            OpsPhase::Unknown(raw) => raw,
        }
    }
}

impl From<String> for OpsPhase {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Pending" => OpsPhase::Pending,
            "Creating" => OpsPhase::Creating,
            "Running" => OpsPhase::Running,
            "Cancelling" => OpsPhase::Cancelling,
            "Cancelled" => OpsPhase::Cancelled,
            "Aborted" => OpsPhase::Aborted,
            "Succeed" => OpsPhase::Succeed,
            "Failed" => OpsPhase::Failed,
            _ => OpsPhase::Unknown(raw),
        }
    }
}

impl From<OpsPhase> for String {
    fn from(phase: OpsPhase) -> Self {
        match phase {
            OpsPhase::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl JsonSchema for OpsPhase {
    fn schema_name() -> Cow<'static, str> {
        "OpsPhase".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        crate::string_schema(generator)
    }
}

impl fmt::Display for OpsPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OpsRequest {
    /// Observed phase, `None` until KubeBlocks picks the request up.
    pub fn phase(&self) -> Option<&OpsPhase> {
        self.status.as_ref().and_then(|s| s.phase.as_ref())
    }
}
