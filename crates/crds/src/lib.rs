//! KubeBlocks resource definitions
//!
//! Client-side views of the KubeBlocks custom resources that kbops submits and
//! observes. Only the fields kbops reads or writes are modelled.

pub mod cluster;
pub mod ops_request;

pub use cluster::*;
pub use ops_request::*;

use schemars::{json_schema, Schema, SchemaGenerator};
use serde::{Deserialize, Deserializer};

/// Read a phase string, treating a missing or empty value as unset.
pub(crate) fn phase_or_unset<'de, D, P>(deserializer: D) -> Result<Option<P>, D::Error>
where
    D: Deserializer<'de>,
    P: From<String>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(P::from))
}

/// Phases are open-ended strings on the wire.
pub(crate) fn string_schema(_: &mut SchemaGenerator) -> Schema {
    json_schema!({ "type": "string" })
}

/// Embedded core Kubernetes types are validated by KubeBlocks, not by us.
pub(crate) fn preserve_unknown_fields(_: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true
    })
}
