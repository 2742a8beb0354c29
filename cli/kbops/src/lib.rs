//! kbops
//!
//! Drives KubeBlocks PostgreSQL cluster lifecycle operations (create, delete,
//! horizontal scale) against a Kubernetes API server and waits for each to
//! reach a terminal state.
//!
//! ```no_run
//! use cluster_client::KubeClusterClient;
//! use kbops::clock::TokioClock;
//! use kbops::config::OpsConfig;
//! use kbops::operations::{OperationContext, ScaleOperation};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = OpsConfig::from_env()?;
//! let client = KubeClusterClient::try_default(config.namespace.clone()).await?;
//! let ctx = OperationContext::new(Arc::new(client), Arc::new(TokioClock), config);
//! ScaleOperation::new(ctx).run("pg-cluster", 3).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod operations;
pub mod poller;

#[cfg(test)]
mod test_utils;

pub use cli::{KbopsCli, KbopsCommands};
pub use error::OpsError;
