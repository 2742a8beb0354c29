//! kbops command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use cluster_client::KubeClusterClient;
use kbops::clock::TokioClock;
use kbops::config::OpsConfig;
use kbops::operations::OperationContext;
use kbops::{KbopsCli, OpsError};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Err carries the provider that was already installed
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        return Err(OpsError::Setup("failed to install rustls crypto provider".to_string()).into());
    }

    let cli = KbopsCli::parse();
    let config = OpsConfig::from_env().context("failed to load configuration")?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace);
    info!("  Cluster definition: {}", config.cluster_definition);
    info!("  Component: {}", config.component.name);

    let client = KubeClusterClient::try_default(config.namespace.clone())
        .await
        .map_err(|e| OpsError::Setup(format!("failed to create Kubernetes client: {}", e)))?;

    let ctx = OperationContext::new(Arc::new(client), Arc::new(TokioClock), config);
    kbops::cli::run(cli, ctx).await
}
