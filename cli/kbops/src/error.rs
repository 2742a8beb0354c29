//! Operation error types.
//!
//! Every failure a lifecycle operation can end in. None of these are retried
//! by kbops itself; the user re-runs the command.

use crate::poller::{DeadlineExceeded, PollError};
use cluster_client::ClientError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while running a lifecycle operation.
#[derive(Debug, Error)]
pub enum OpsError {
    /// Client or runtime could not be set up
    #[error("Setup failed: {0}")]
    Setup(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Target replica count out of range
    #[error("Invalid replica count {0}: must be at least 1")]
    InvalidReplicas(i32),

    /// A create, delete or read-before-write call failed
    #[error("Failed to {action} {name}: {source}")]
    Submission {
        action: &'static str,
        name: String,
        #[source]
        source: ClientError,
    },

    /// The cluster being created already exists
    #[error("Cluster {0} already exists")]
    AlreadyExists(String),

    /// An object that must exist was not found
    #[error("{0} not found")]
    NotFound(String),

    /// The cluster has no component with the configured name
    #[error("Cluster {cluster} has no component named {component}")]
    ComponentNotFound { cluster: String, component: String },

    /// A status read failed while waiting
    #[error("Failed to read {what}: {source}")]
    Read {
        what: String,
        #[source]
        source: ClientError,
    },

    /// The remote object reached a failure phase
    #[error("{what} failed with phase {phase}")]
    RemoteFailure { what: String, phase: String },

    /// No terminal phase observed before the deadline
    #[error("Timed out after {waited:?} waiting for {what}")]
    Timeout {
        what: String,
        waited: Duration,
        #[source]
        source: DeadlineExceeded,
    },

    /// Manifest rendering for --dry-run failed
    #[error("Failed to render manifest: {0}")]
    Render(#[from] serde_yaml::Error),
}

impl OpsError {
    /// Wrap a failed submission call, turning a 404 into `NotFound`.
    pub fn submission(action: &'static str, name: &str, source: ClientError) -> Self {
        match source {
            ClientError::NotFound(what) => OpsError::NotFound(what),
            source => OpsError::Submission {
                action,
                name: name.to_string(),
                source,
            },
        }
    }
}

impl From<PollError> for OpsError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Read { what, source } => OpsError::Read { what, source },
            PollError::NotFound(what) => OpsError::NotFound(what),
            PollError::Failed { what, phase } => OpsError::RemoteFailure { what, phase },
            PollError::Timeout { what, waited, cause } => OpsError::Timeout {
                what,
                waited,
                source: cause,
            },
        }
    }
}
