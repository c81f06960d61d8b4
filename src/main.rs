// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::Client;
use std::io;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use capdeploy::config::{ConfigArgs, DeployConfig};
use capdeploy::deploy::Deployment;
use capdeploy::kubernetes::KubeCluster;
use capdeploy::preflight::check_preconditions;
use capdeploy::types::DeploymentTarget;

/// Deploy the AMS policies and HANA schema of a CAP application to Kubernetes
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Runs `hana` then `ams` when omitted
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy AMS authorization policies
    Ams {
        /// Delete the generated Job, ConfigMap and binding Secret
        #[arg(long)]
        cleanup: bool,
    },
    /// Deploy the HANA schema through HDI
    Hana {
        /// Delete the generated Job and binding Secret
        #[arg(long, conflicts_with = "logs")]
        cleanup: bool,
        /// Print the deployer Job's logs
        #[arg(long)]
        logs: bool,
    },
    /// Deploy the HANA schema, then the AMS policies
    All,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are reported through the error path too
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = DeployConfig::from(cli.config);
    info!(
        "Configuration loaded: app={} namespace={}",
        config.app_name, config.namespace
    );

    let command = cli.command.unwrap_or(Command::All);
    // Local problems are reported before any cluster access is attempted
    preflight(&config, &command)?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let cluster = KubeCluster::new(client);

    match command {
        Command::Ams { cleanup: true } => {
            Deployment::new(&cluster, &config, DeploymentTarget::AmsPolicies, io::stdout())
                .cleanup()
                .await?
        }
        Command::Ams { cleanup: false } => {
            deploy(&cluster, &config, DeploymentTarget::AmsPolicies).await?
        }
        Command::Hana { cleanup: true, .. } => {
            Deployment::new(&cluster, &config, DeploymentTarget::HanaSchema, io::stdout())
                .cleanup()
                .await?
        }
        Command::Hana { logs: true, .. } => {
            Deployment::new(&cluster, &config, DeploymentTarget::HanaSchema, io::stdout())
                .print_logs()
                .await?
        }
        Command::Hana { .. } => deploy(&cluster, &config, DeploymentTarget::HanaSchema).await?,
        Command::All => {
            deploy(&cluster, &config, DeploymentTarget::HanaSchema).await?;
            deploy(&cluster, &config, DeploymentTarget::AmsPolicies).await?;
        }
    }

    Ok(())
}

/// Targets the command will deploy, in run order
fn deploy_targets(command: &Command) -> Vec<DeploymentTarget> {
    match command {
        Command::Ams { cleanup: false } => vec![DeploymentTarget::AmsPolicies],
        Command::Hana {
            cleanup: false,
            logs: false,
        } => vec![DeploymentTarget::HanaSchema],
        Command::All => vec![DeploymentTarget::HanaSchema, DeploymentTarget::AmsPolicies],
        _ => Vec::new(),
    }
}

fn preflight(config: &DeployConfig, command: &Command) -> Result<()> {
    for target in deploy_targets(command) {
        check_preconditions(
            &config.descriptor(target),
            &config.required_tools,
            config.strict_artifacts,
        )
        .with_context(|| format!("{} preconditions not met", target))?;
    }
    Ok(())
}

async fn deploy(cluster: &KubeCluster, config: &DeployConfig, target: DeploymentTarget) -> Result<()> {
    let mut deployment = Deployment::new(cluster, config, target, io::stdout());

    if let Err(e) = deployment.run().await {
        if e.is_platform_failure() {
            warn!(
                "Applied resources were left in namespace {}, run `capdeploy {} --cleanup` to remove them",
                config.namespace, target
            );
        }
        return Err(e).with_context(|| format!("{} deployment failed", target));
    }

    info!("{} deployment finished", target);
    Ok(())
}
