//! Command-line surface.
//!
//! Parses `create`, `delete` and `scale`, makes sure the namespace exists
//! for real runs, and renders manifests for `--dry-run`.

use crate::error::OpsError;
use crate::operations::{
    CreateOperation, DeleteOperation, OperationContext, ScaleOperation, ScaleOutcome, ScalePlan,
};
use anyhow::Context;
use clap::builder::NonEmptyStringValueParser;
use tracing::info;

/// Main CLI structure
#[derive(clap::Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct KbopsCli {
    /// Command to run
    #[command(subcommand)]
    pub command: KbopsCommands,
}

/// Lifecycle commands
#[derive(clap::Subcommand, Clone, Debug)]
pub enum KbopsCommands {
    /// Create a cluster and wait until it is Running
    #[clap(aliases = &["c"])]
    Create {
        /// Cluster name
        #[arg(short, long, value_parser = NonEmptyStringValueParser::new())]
        name: String,
        /// Print the Cluster manifest instead of submitting it
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete a cluster and wait until it is gone
    #[clap(aliases = &["d", "rm"])]
    Delete {
        /// Cluster name
        #[arg(short, long, value_parser = NonEmptyStringValueParser::new())]
        name: String,
    },
    /// Scale the cluster's component to a replica count
    #[clap(aliases = &["s"])]
    Scale {
        /// Cluster name
        #[arg(short, long, value_parser = NonEmptyStringValueParser::new())]
        name: String,
        /// Target replica count
        #[arg(short, long, value_parser = clap::value_parser!(i32).range(1..))]
        replicas: i32,
        /// Print the OpsRequest instead of submitting it
        #[arg(long)]
        dry_run: bool,
    },
}

impl KbopsCommands {
    fn is_dry_run(&self) -> bool {
        match self {
            KbopsCommands::Create { dry_run, .. } | KbopsCommands::Scale { dry_run, .. } => *dry_run,
            KbopsCommands::Delete { .. } => false,
        }
    }
}

/// Run one parsed command against `ctx`.
pub async fn run(cli: KbopsCli, ctx: OperationContext) -> anyhow::Result<()> {
    if !cli.command.is_dry_run() {
        cluster_client::ensure_namespace(ctx.client.as_ref())
            .await
            .with_context(|| format!("failed to ensure namespace {}", ctx.client.namespace()))?;
    }

    match cli.command {
        KbopsCommands::Create { name, dry_run } => {
            let op = CreateOperation::new(ctx);
            if dry_run {
                print!("{}", render_create(&op, &name)?);
                return Ok(());
            }
            op.run(&name)
                .await
                .with_context(|| format!("create of cluster {} failed", name))?;
        }
        KbopsCommands::Delete { name } => {
            DeleteOperation::new(ctx)
                .run(&name)
                .await
                .with_context(|| format!("delete of cluster {} failed", name))?;
        }
        KbopsCommands::Scale {
            name,
            replicas,
            dry_run,
        } => {
            let op = ScaleOperation::new(ctx);
            if dry_run {
                let rendered = render_scale(&op, &name, replicas)
                    .await
                    .with_context(|| format!("scale of cluster {} failed", name))?;
                print!("{}", rendered);
                return Ok(());
            }
            let outcome = op
                .run(&name, replicas)
                .await
                .with_context(|| format!("scale of cluster {} failed", name))?;
            if let ScaleOutcome::Scaled { ops_request, .. } = outcome {
                info!("OpsRequest {} completed", ops_request);
            }
        }
    }
    Ok(())
}

fn render_create(op: &CreateOperation, name: &str) -> Result<String, OpsError> {
    Ok(serde_yaml::to_string(&op.build_cluster(name))?)
}

async fn render_scale(op: &ScaleOperation, name: &str, replicas: i32) -> Result<String, OpsError> {
    match op.plan(name, replicas).await? {
        ScalePlan::Unchanged { replicas } => Ok(format!(
            "# cluster {} already has {} replicas, nothing to submit\n",
            name, replicas
        )),
        ScalePlan::Submit { request, .. } => Ok(serde_yaml::to_string(&request)?),
    }
}
