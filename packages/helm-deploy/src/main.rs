//! Helm Deploy Entry Point
//!
//! Runs one deploy or undeploy and turns the result into the exit code.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use helm_deploy::cli::config::Config;
use helm_deploy::cli::context::TriggerContext;
use helm_deploy::dispatch::{self, Outcome};
use helm_deploy::error::ConfigError;
use helm_deploy::release::helm::cli::HelmCli;
use helm_deploy::remote::github::client::GitHubClient;
use helm_deploy::{logging, workflow};

#[derive(Parser)]
#[command(name = "helm-deploy")]
#[command(
    author,
    version,
    about = "Helm Deploy - Install or remove a Helm release and track it as a GitHub deployment"
)]
struct Cli {
    /// Path to a TOML configuration file (flags and environment win over it)
    #[arg(short, long, env = "HELM_DEPLOY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(flatten)]
    settings: Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(cli.settings, cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            workflow::error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.logging, cli.verbose) {
        workflow::error(&format!("{:#}", e));
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = describe(&e);
            error!(error = %message, "helm-deploy failed");
            workflow::error(&message);
            ExitCode::FAILURE
        }
    }
}

/// Layer flags and environment over the optional TOML file
fn resolve_config(settings: Config, path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Ok(settings.layered_over(Config::load(path)?)),
        None => Ok(settings),
    }
}

async fn run(config: Config) -> Result<()> {
    let context = TriggerContext::from_env().context("Failed to read workflow context")?;
    let token = config.token()?;

    let api = GitHubClient::with_base_url(&token, &config.api_url())
        .context("Failed to create GitHub client")?;
    let helm = HelmCli::with_binary(config.helm_bin()).with_timeout(config.helm_timeout());

    info!(
        action = %config.action(),
        repository = %context.repository,
        helm = %helm.binary(),
        "Starting helm-deploy"
    );

    match dispatch::run(&config, context, Arc::new(api), Arc::new(helm)).await? {
        Outcome::Deployed(report) => {
            info!(
                deployment_id = report.deployment_id,
                environment = %report.environment,
                git_ref = %report.git_ref,
                elapsed_ms = report.elapsed_ms,
                "Deployment succeeded"
            );
        }
        Outcome::Undeployed(report) => {
            info!(
                discovered = report.discovered.len(),
                deleted = report.deleted.len(),
                "Undeploy succeeded"
            );
        }
    }

    Ok(())
}

/// Join the error chain, skipping causes already quoted by their parent
fn describe(err: &anyhow::Error) -> String {
    let mut message = err.to_string();
    for cause in err.chain().skip(1) {
        let text = cause.to_string();
        if !message.contains(&text) {
            message = format!("{}: {}", message, text);
        }
    }
    message
}
